use chrono::Local;
use reqwest::blocking::Client;

use crate::search::SearchApi;
use crate::sink::{BatchWriter, LookupIndex};
use crate::stream::CourseStream;
use crate::taxonomy::discover_disciplines;
use crate::{info_time, Config, Error, Result};

/// Runs the whole harvest: taxonomy walk, course stream, batch files, lookup
/// tables. Both sinks consume the stream in a single pass; any retrieval or
/// parse failure unwinds the run (batches already on disk stay valid).
pub fn download_courses(cfg: &Config) -> Result<()> {
    // Don't touch the network if there is nowhere to write.
    if !cfg.out_dir.exists() {
        return Err(Error::MissingDestination(cfg.out_dir.clone()));
    }

    let start_time = Local::now();
    let client = Client::new();

    let disciplines = discover_disciplines(&client, cfg)?;
    info_time!(start_time, "Discovered {} disciplines", disciplines.len());

    let source = SearchApi::new(client, cfg);
    let mut writer = BatchWriter::new(&cfg.out_dir, cfg.flush_threshold);
    let mut index = LookupIndex::new();

    let mut n_courses = 0usize;
    for item in CourseStream::new(&source, &disciplines) {
        let (key, course) = item?;
        index.insert(key.0, &course)?;
        writer.push(key, course)?;
        n_courses += 1;
    }
    writer.finish()?;
    index.write(&cfg.out_dir, &disciplines)?;

    info_time!(start_time, "Harvested {} course listings", n_courses);
    Ok(())
}
