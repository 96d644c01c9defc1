//! Frontmatter schemas for each content type.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{parse_date, FieldValidator, Frontmatter};
use crate::content::ContentType;

/// Client story (case study)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Story {
    /// Client name
    pub name: String,
    pub title: String,
    pub description: String,
    pub date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default)]
    pub services: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// External video ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ignore: Option<bool>,
}

impl Story {
    pub fn published_on(&self) -> Option<NaiveDate> {
        parse_date(&self.date)
    }
}

impl Frontmatter for Story {
    const CONTENT_TYPE: ContentType = ContentType::Story;
    const KNOWN_FIELDS: &'static [&'static str] = &[
        "name",
        "title",
        "description",
        "date",
        "image",
        "services",
        "tags",
        "video",
        "ignore",
    ];

    fn rules(fields: &mut FieldValidator) {
        fields.required_string("name");
        fields.required_string("title");
        fields.required_string("description");
        fields.date("date");
        fields.optional_string("image");
        fields.string_array("services");
        fields.string_array("tags");
        fields.optional_video_id("video");
        fields.optional_bool("ignore");
    }
}

/// Blog post
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Blogpost {
    pub title: String,
    pub description: String,
    pub author: String,
    pub date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ignore: Option<bool>,
}

impl Blogpost {
    pub fn published_on(&self) -> Option<NaiveDate> {
        parse_date(&self.date)
    }
}

impl Frontmatter for Blogpost {
    const CONTENT_TYPE: ContentType = ContentType::Blogpost;
    const KNOWN_FIELDS: &'static [&'static str] = &[
        "title",
        "description",
        "author",
        "date",
        "image",
        "tags",
        "video",
        "ignore",
    ];

    fn rules(fields: &mut FieldValidator) {
        fields.required_string("title");
        fields.required_string("description");
        fields.required_string("author");
        fields.date("date");
        fields.optional_string("image");
        fields.string_array("tags");
        fields.optional_video_id("video");
        fields.optional_bool("ignore");
    }
}

/// Standalone page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ignore: Option<bool>,
}

impl Frontmatter for Page {
    const CONTENT_TYPE: ContentType = ContentType::Page;
    const KNOWN_FIELDS: &'static [&'static str] = &["title", "description", "keywords", "ignore"];

    fn rules(fields: &mut FieldValidator) {
        fields.required_string("title");
        fields.required_string("description");
        fields.string_array("keywords");
        fields.optional_bool("ignore");
    }
}

/// Job offer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Offer {
    pub title: String,
    pub location: String,
    /// Contract kind (full-time, internship, ...)
    pub contract: String,
    pub date: String,
    pub description: String,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ignore: Option<bool>,
}

impl Frontmatter for Offer {
    const CONTENT_TYPE: ContentType = ContentType::Offer;
    const KNOWN_FIELDS: &'static [&'static str] = &[
        "title",
        "location",
        "contract",
        "date",
        "description",
        "skills",
        "ignore",
    ];

    fn rules(fields: &mut FieldValidator) {
        fields.required_string("title");
        fields.required_string("location");
        fields.required_string("contract");
        fields.date("date");
        fields.required_string("description");
        fields.string_array("skills");
        fields.optional_bool("ignore");
    }
}
