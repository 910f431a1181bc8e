use std::collections::HashMap;

use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::{Config, Error, Result};

/// A single course as returned by the search endpoint. Stays an open mapping,
/// the server decides which fields a listing carries.
pub type Course = Map<String, Value>;

/// Every course carries a numeric id; one without it can't be indexed.
pub fn course_id(course: &Course) -> Result<u64> {
    course
        .get("id")
        .and_then(Value::as_u64)
        .ok_or(Error::MalformedCourse("id"))
}

/// The two queries the stream assembler needs. A trait so tests can feed the
/// pipeline canned data instead of live HTTP responses.
pub trait CourseSource {
    type Courses: Iterator<Item = Result<Course>>;

    /// `(degree level, total course count)` pairs for one discipline, in
    /// whatever order the server reports them.
    fn level_counts(&self, discipline_id: u32) -> Result<Vec<(String, u64)>>;

    /// All courses of one discipline at one degree level, page by page.
    fn courses(&self, discipline_id: u32, level: &str, total: u64) -> Self::Courses;
}

/// The live search endpoints, behind a single reused blocking client.
pub struct SearchApi {
    client: Client,
    facets_url: String,
    search_url: String,
    page_size: u64,
}

#[derive(Deserialize)]
struct LevelFacets {
    lv: HashMap<String, u64>,
}

impl SearchApi {
    pub fn new(client: Client, cfg: &Config) -> Self {
        Self {
            client,
            facets_url: cfg.facets_url.clone(),
            search_url: cfg.search_url.clone(),
            page_size: cfg.page_size,
        }
    }
}

impl CourseSource for SearchApi {
    type Courses = CoursePages;

    fn level_counts(&self, discipline_id: u32) -> Result<Vec<(String, u64)>> {
        let res = self
            .client
            .get(&self.facets_url)
            .query(&[
                ("q", format!("di-{discipline_id}")),
                ("facets", r#"["lv"]"#.to_owned()),
            ])
            .send()?
            .error_for_status()?;
        let facets: LevelFacets = res.json()?;
        Ok(facets.lv.into_iter().collect())
    }

    fn courses(&self, discipline_id: u32, level: &str, total: u64) -> CoursePages {
        CoursePages {
            // reqwest clients share their pool, cloning is cheap
            client: self.client.clone(),
            search_url: self.search_url.clone(),
            query: search_query(discipline_id, level),
            level: level.to_owned(),
            page_size: self.page_size,
            n_pages: page_count(total, self.page_size),
            next_page: 0,
            buf: Vec::new().into_iter(),
            failed: false,
        }
    }
}

/// Lazily walks the result pages of one (discipline, level) query. A page is
/// only requested once the previous one is drained, so at most `page_size`
/// raw courses are in memory at a time. The first failed page poisons the
/// iterator: one `Err` is yielded, then it fuses.
pub struct CoursePages {
    client: Client,
    search_url: String,
    query: String,
    level: String,
    page_size: u64,
    n_pages: u64,
    next_page: u64,
    buf: std::vec::IntoIter<Course>,
    failed: bool,
}

impl CoursePages {
    fn fetch_page(&self, page: u64) -> Result<Vec<Course>> {
        let res = self
            .client
            .get(&self.search_url)
            .query(&[
                ("start", (page * self.page_size).to_string()),
                ("q", self.query.clone()),
            ])
            .send()?
            .error_for_status()?;
        Ok(res.json()?)
    }
}

impl Iterator for CoursePages {
    type Item = Result<Course>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        loop {
            for course in self.buf.by_ref() {
                if is_level(&course, &self.level) {
                    return Some(Ok(course));
                }
            }
            if self.next_page == self.n_pages {
                return None;
            }
            let page = self.next_page;
            self.next_page += 1;
            match self.fetch_page(page) {
                Ok(courses) => self.buf = courses.into_iter(),
                Err(e) => {
                    self.failed = true;
                    return Some(Err(e));
                }
            }
        }
    }
}

/// Sublevels are cross-listed under their parent level (e.g. preparation is
/// its own level and also shows up under bachelor), so only courses whose
/// reported level matches the queried one count.
fn is_level(course: &Course, level: &str) -> bool {
    course.get("level").and_then(Value::as_str) == Some(level)
}

/// Composite filter string for the search endpoint. The `en`, `uc` and `ur`
/// tokens are required by the server; their meaning is anyone's guess.
fn search_query(discipline_id: u32, level: &str) -> String {
    [
        format!("di-{discipline_id}"), // Discipline
        "en-3002".to_owned(),
        format!("lv-{level}"), // Degree level
        "tc-EUR".to_owned(),   // Currency
        "uc-30".to_owned(),
        "ur-38".to_owned(),
    ]
    .join("|")
}

pub(crate) fn page_count(total: u64, page_size: u64) -> u64 {
    total.div_ceil(page_size)
}
