use chrono::Local;
use coursescrap::{info_time, process::download_courses, Config, Result};

fn main() -> Result<()> {
    let start_time = Local::now();
    download_courses(&Config::default())?;
    info_time!(start_time, "Full harvest time:");

    Ok(())
}
