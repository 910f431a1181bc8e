use chrono::Local;
use reqwest::blocking::Client;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};

use crate::{info_time, Config, Error, Result};

/// Section id of the root discipline listing.
const ROOT_SECTION: &str = "DisciplineSpotlight";
/// Section id of the subdiscipline listing on each root discipline's page.
const SUB_SECTION: &str = "SubdisciplinesList";

/// One node of the two-level discipline tree. Children point back at their
/// root through `parent`, roots carry `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discipline {
    pub discipline_id: u32,
    pub discipline_title: String,
    pub parent: Option<u32>,
}

impl Discipline {
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

/// Walks the discipline tree: the root listing first, then every root's own
/// page for its subdisciplines. Any non-2xx response or missing markup aborts
/// the whole walk since a partial taxonomy is useless downstream.
pub fn discover_disciplines(client: &Client, cfg: &Config) -> Result<Vec<Discipline>> {
    let html = fetch_page(client, &cfg.disciplines_url)?;
    let roots = parse_discipline_section(&html, ROOT_SECTION, None)?;

    let mut disciplines = Vec::new();
    for (root, href) in roots {
        info_time!("Discovering subdisciplines of `{}`", root.discipline_title);
        let sub_html = fetch_page(client, &href)?;
        let children = parse_discipline_section(&sub_html, SUB_SECTION, Some(root.discipline_id))?;
        disciplines.push(root);
        disciplines.extend(children.into_iter().map(|(child, _)| child));
    }
    Ok(disciplines)
}

fn fetch_page(client: &Client, url: &str) -> Result<String> {
    let res = client.get(url).send()?.error_for_status()?;
    Ok(res.text()?)
}

/// Extracts a `(discipline, href)` pair from every list item of the section
/// with the given id. The discipline id sits in the second-to-last path
/// segment of the item's link.
fn parse_discipline_section(
    html: &str,
    section_id: &str,
    parent: Option<u32>,
) -> Result<Vec<(Discipline, String)>> {
    let doc = Html::parse_document(html);

    let section_sel = create_selector(&format!("section#{section_id}"))?;
    let item_sel = create_selector("li")?;
    let anchor_sel = create_selector("a[href]")?;

    let section = doc
        .select(&section_sel)
        .next()
        .ok_or_else(|| Error::ParseMissingSection(section_id.into()))?;

    let mut found = Vec::new();
    for item in section.select(&item_sel) {
        let anchor = item
            .select(&anchor_sel)
            .next()
            .ok_or_else(|| Error::ParseMissingSection(format!("{section_id} item anchor")))?;
        let href = anchor.value().attr("href").unwrap_or_default().to_owned();
        let id: u32 = href
            .split('/')
            .rev()
            .nth(1)
            .and_then(|segment| segment.parse().ok())
            .ok_or_else(|| Error::ParseDisciplineId(href.clone()))?;
        let title = anchor.text().collect::<String>().trim().to_owned();

        let discipline = Discipline {
            discipline_id: id,
            discipline_title: title,
            parent,
        };
        found.push((discipline, href));
    }
    Ok(found)
}

#[inline]
fn create_selector(sel_str: &str) -> Result<Selector> {
    Selector::parse(sel_str).map_err(|_| Error::ParseBadSelector(sel_str.into()))
}
