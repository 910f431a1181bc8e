use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::search::{course_id, Course};
use crate::stream::BatchKey;
use crate::taxonomy::Discipline;
use crate::Result;

/// Buffers courses per (discipline, level) and writes a JSON batch whenever a
/// buffer reaches the flush threshold, keeping memory bounded no matter how
/// long the stream runs. Batch files are labeled with the running course
/// count of their key, so successive flushes never collide.
pub struct BatchWriter {
    out_dir: PathBuf,
    flush_threshold: usize,
    buffers: HashMap<BatchKey, Vec<Course>>,
    flushed: HashMap<BatchKey, usize>,
}

impl BatchWriter {
    pub fn new(out_dir: &Path, flush_threshold: usize) -> Self {
        Self {
            out_dir: out_dir.to_owned(),
            flush_threshold,
            buffers: HashMap::new(),
            flushed: HashMap::new(),
        }
    }

    pub fn push(&mut self, key: BatchKey, course: Course) -> Result<()> {
        let buf = self.buffers.entry(key.clone()).or_default();
        buf.push(course);
        if buf.len() < self.flush_threshold {
            return Ok(());
        }
        let batch = std::mem::take(buf);
        let label = {
            let flushed = self.flushed.entry(key.clone()).or_insert(0);
            *flushed += self.flush_threshold;
            *flushed
        };
        self.write_batch(&key, label, &batch)
    }

    /// Flushes whatever is left once the stream is exhausted. A short buffer
    /// still gets a full-threshold label, so the numeric suffix of a key's
    /// last file overstates its cumulative count. Existing data was written
    /// with that naming, keep it.
    pub fn finish(mut self) -> Result<()> {
        let mut leftovers: Vec<(BatchKey, Vec<Course>)> = self
            .buffers
            .drain()
            .filter(|(_, batch)| !batch.is_empty())
            .collect();
        leftovers.sort_unstable_by(|(a, _), (b, _)| a.cmp(b));
        for (key, batch) in leftovers {
            let label = self.flushed.get(&key).copied().unwrap_or(0) + self.flush_threshold;
            self.write_batch(&key, label, &batch)?;
        }
        Ok(())
    }

    fn write_batch(&self, key: &BatchKey, label: usize, batch: &[Course]) -> Result<()> {
        let (di, lvl) = key;
        let dir = self.out_dir.join(di.to_string()).join(lvl);
        fs::create_dir_all(&dir)?;
        write_json(&dir.join(format!("{di}-{lvl}-{label}.json")), &batch)
    }
}

/// The two cross-reference lookups, kept sorted and duplicate-free as they
/// grow so serializing them is a straight dump: JSON objects keyed by id,
/// each value an ascending id array.
#[derive(Debug, Default)]
pub struct LookupIndex {
    course_disciplines: BTreeMap<u64, BTreeSet<u32>>,
    discipline_courses: BTreeMap<u32, BTreeSet<u64>>,
}

impl LookupIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the membership in both directions. Re-inserting an existing
    /// pair is a no-op, cross-listed courses show up once per discipline.
    pub fn insert(&mut self, discipline_id: u32, course: &Course) -> Result<()> {
        let ci = course_id(course)?;
        self.course_disciplines
            .entry(ci)
            .or_default()
            .insert(discipline_id);
        self.discipline_courses
            .entry(discipline_id)
            .or_default()
            .insert(ci);
        Ok(())
    }

    /// Writes both lookup tables and the discipline dictionary next to the
    /// batch directories.
    pub fn write(&self, out_dir: &Path, disciplines: &[Discipline]) -> Result<()> {
        write_json(
            &out_dir.join("course_discipline_lookup.json"),
            &self.course_disciplines,
        )?;
        write_json(
            &out_dir.join("discipline_course_lookup.json"),
            &self.discipline_courses,
        )?;
        write_json(&out_dir.join("discipline_dictionary.json"), &disciplines)
    }
}

fn write_json<T: Serialize>(path: &Path, data: &T) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, data)?;
    // a buffer flushed in Drop would discard the error
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};
    use tempfile::tempdir;

    use super::*;

    fn course(id: u64) -> Course {
        json!({"id": id, "level": "bachelor"})
            .as_object()
            .cloned()
            .unwrap()
    }

    fn read_batch(path: &Path) -> Vec<Value> {
        serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
    }

    #[test]
    fn full_and_remainder_flushes() {
        let dir = tempdir().unwrap();
        let key: BatchKey = (1, "bachelor".into());
        let mut writer = BatchWriter::new(dir.path(), 3);

        // 7 courses at threshold 3: full batches labeled 3 and 6
        for id in 0..7 {
            writer.push(key.clone(), course(id)).unwrap();
        }
        let batch_dir = dir.path().join("1").join("bachelor");
        assert_eq!(read_batch(&batch_dir.join("1-bachelor-3.json")).len(), 3);
        assert_eq!(read_batch(&batch_dir.join("1-bachelor-6.json")).len(), 3);
        assert!(!batch_dir.join("1-bachelor-9.json").exists());

        // remainder flush holds 1 course but is labeled 6 + 3
        writer.finish().unwrap();
        assert_eq!(read_batch(&batch_dir.join("1-bachelor-9.json")).len(), 1);
    }

    #[test]
    fn exact_multiple_leaves_no_remainder() {
        let dir = tempdir().unwrap();
        let key: BatchKey = (2, "phd".into());
        let mut writer = BatchWriter::new(dir.path(), 2);

        for id in 0..4 {
            writer.push(key.clone(), course(id)).unwrap();
        }
        writer.finish().unwrap();

        let batch_dir = dir.path().join("2").join("phd");
        assert!(batch_dir.join("2-phd-2.json").exists());
        assert!(batch_dir.join("2-phd-4.json").exists());
        assert!(!batch_dir.join("2-phd-6.json").exists());
    }

    #[test]
    fn keys_flush_independently() {
        let dir = tempdir().unwrap();
        let mut writer = BatchWriter::new(dir.path(), 2);

        writer.push((1, "phd".into()), course(1)).unwrap();
        writer.push((1, "bachelor".into()), course(2)).unwrap();
        writer.push((1, "phd".into()), course(3)).unwrap();
        writer.finish().unwrap();

        // phd reached the threshold, bachelor only got the remainder flush
        assert!(dir.path().join("1/phd/1-phd-2.json").exists());
        assert!(dir.path().join("1/bachelor/1-bachelor-2.json").exists());
        assert_eq!(
            read_batch(&dir.path().join("1/bachelor/1-bachelor-2.json")).len(),
            1
        );
    }

    #[test]
    fn lookups_come_out_sorted_and_deduplicated() {
        let mut index = LookupIndex::new();
        // scrambled insertion order, with repeats
        for (di, ci) in [(9, 5), (2, 5), (9, 5), (2, 1), (2, 4), (2, 1)] {
            index.insert(di, &course(ci)).unwrap();
        }

        let value = serde_json::to_value(&index.course_disciplines).unwrap();
        assert_eq!(value, json!({"1": [2], "4": [2], "5": [2, 9]}));

        let value = serde_json::to_value(&index.discipline_courses).unwrap();
        assert_eq!(value, json!({"2": [1, 4, 5], "9": [5]}));
    }

    #[test]
    fn index_write_emits_all_three_files() {
        let dir = tempdir().unwrap();
        let mut index = LookupIndex::new();
        index.insert(1, &course(10)).unwrap();

        let disciplines = vec![Discipline {
            discipline_id: 1,
            discipline_title: "One".into(),
            parent: None,
        }];
        index.write(dir.path(), &disciplines).unwrap();

        let lookup: Value = serde_json::from_str(
            &fs::read_to_string(dir.path().join("course_discipline_lookup.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(lookup, json!({"10": [1]}));
        assert!(dir.path().join("discipline_course_lookup.json").exists());

        let dict: Vec<Discipline> = serde_json::from_str(
            &fs::read_to_string(dir.path().join("discipline_dictionary.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(dict, disciplines);
    }

    #[test]
    #[cfg(target_os = "linux")]
    fn write_errors_surface_instead_of_vanishing_in_drop() {
        // /dev/full rejects every write with ENOSPC; the error must come back
        // through write_json, not get eaten when the buffer drops
        let res = write_json(Path::new("/dev/full"), &vec![course(1)]);
        assert!(res.is_err());
    }

    #[test]
    fn indexing_a_course_without_an_id_fails() {
        let mut index = LookupIndex::new();
        let bad = json!({"title": "nameless"}).as_object().cloned().unwrap();
        assert!(index.insert(1, &bad).is_err());
    }
}
