use serde_json::Value;

use crate::search::{Course, CourseSource};
use crate::taxonomy::Discipline;
use crate::Result;

/// Fields dropped from every course before it is persisted. Absence is fine.
pub const BORING_KEYS: [&str; 3] = ["listing_type", "enhanced", "logo"];

/// Buffer key of the batch writer: (discipline id, degree level).
pub type BatchKey = (u32, String);

/// Strips the fields nobody asked for and tags the course with the discipline
/// it was found under.
pub fn clean_course(mut course: Course, discipline: &Discipline) -> Course {
    for key in BORING_KEYS {
        course.remove(key);
    }
    course.insert("discipline_id".into(), discipline.discipline_id.into());
    course.insert(
        "discipline_title".into(),
        Value::String(discipline.discipline_title.clone()),
    );
    course
}

/// The single stream both sinks consume: every course of every non-root
/// discipline, cleaned and keyed by (discipline, level). Root disciplines are
/// containers, not classification targets, and are skipped. Courses are
/// pulled one page at a time; nothing is materialized up front.
pub struct CourseStream<'a, S: CourseSource> {
    source: &'a S,
    disciplines: std::slice::Iter<'a, Discipline>,
    current: Option<Current<'a, S>>,
}

struct Current<'a, S: CourseSource> {
    discipline: &'a Discipline,
    levels: std::vec::IntoIter<(String, u64)>,
    level: String,
    courses: Option<S::Courses>,
}

impl<'a, S: CourseSource> CourseStream<'a, S> {
    pub fn new(source: &'a S, disciplines: &'a [Discipline]) -> Self {
        Self {
            source,
            disciplines: disciplines.iter(),
            current: None,
        }
    }
}

impl<'a, S: CourseSource> Iterator for CourseStream<'a, S> {
    type Item = Result<(BatchKey, Course)>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(cur) = self.current.as_mut() {
                // Courses of the current level first.
                if let Some(courses) = cur.courses.as_mut() {
                    match courses.next() {
                        Some(Ok(course)) => {
                            let key = (cur.discipline.discipline_id, cur.level.clone());
                            return Some(Ok((key, clean_course(course, cur.discipline))));
                        }
                        Some(Err(e)) => return Some(Err(e)),
                        None => cur.courses = None,
                    }
                    continue;
                }
                // Then the next level of the current discipline.
                if let Some((level, total)) = cur.levels.next() {
                    cur.courses =
                        Some(self.source.courses(cur.discipline.discipline_id, &level, total));
                    cur.level = level;
                    continue;
                }
                self.current = None;
            }
            // Then the next non-root discipline.
            let discipline = self.disciplines.find(|d| !d.is_root())?;
            match self.source.level_counts(discipline.discipline_id) {
                Ok(levels) => {
                    self.current = Some(Current {
                        discipline,
                        levels: levels.into_iter(),
                        level: String::new(),
                        courses: None,
                    });
                }
                Err(e) => return Some(Err(e)),
            }
        }
    }
}
