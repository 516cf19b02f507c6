use time::format_description::FormatItem;
use time::macros::format_description;

const DATE: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");
const TIME: &[FormatItem<'static>] = format_description!("[hour]:[minute]:[second] UTC");

/// Build stamp for the CLI banner. Reproducible builds pin it through the
/// environment variable of the same name.
fn stamp(var: &str, now: time::OffsetDateTime, fmt: &[FormatItem<'_>]) -> String {
    println!("cargo:rerun-if-env-changed={var}");
    std::env::var(var).unwrap_or_else(|_| now.format(fmt).unwrap_or_else(|_| "unknown".into()))
}

fn main() {
    let now = time::OffsetDateTime::now_utc();
    for (var, fmt) in [("WAVEFRONT_BUILD_DATE", DATE), ("WAVEFRONT_BUILD_TIME", TIME)] {
        println!("cargo:rustc-env={var}={}", stamp(var, now, fmt));
    }
}
