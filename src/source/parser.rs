//! Wiki document parsers
//!
//! This module turns fetched documents into typed records:
//! - Page revision metadata from the API's XML
//! - The novel listing from the site navigation
//! - A novel's synopsis, cover and book/chapter tree from its detail page
//! - A page body and its embedded images from the API's parse output
//! - The direct download URL from a wiki file page

use crate::model::{BookModel, ImageModel, NovelCollectionModel, NovelContentModel, PageModel, PageType};
use crate::{ParseError, ParseResult};
use chrono::{DateTime, Utc};
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Turns raw wiki documents into records
///
/// Implementations are pure: no I/O, no clock. Freshness timestamps and
/// parent links are stamped by the caller.
pub trait DocumentParser: Send + Sync {
    /// Parses page info returned by the API for `page`
    fn parse_page_metadata(&self, page: &str, document: &str) -> ParseResult<PageModel>;

    /// Parses the novel listing, in document order
    fn parse_listing(&self, document: &str) -> ParseResult<Vec<PageModel>>;

    /// Parses a novel's detail page
    fn parse_details(&self, page: &str, document: &str) -> ParseResult<NovelCollectionModel>;

    /// Parses the structured parse output of a page
    fn parse_content(&self, page: &str, document: &str) -> ParseResult<NovelContentModel>;

    /// Extracts the direct download URL from a wiki file page
    fn parse_image_page(&self, document: &str) -> ParseResult<String>;
}

/// Parser for MediaWiki markup as served by the novel wiki
#[derive(Debug, Clone)]
pub struct WikiParser {
    base_url: Url,
}

fn selector(css: &'static str) -> ParseResult<Selector> {
    Selector::parse(css).map_err(|_| ParseError::InvalidSelector(css))
}

fn text_of(element: ElementRef<'_>) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn has_class(element: ElementRef<'_>, class: &str) -> bool {
    element.value().classes().any(|c| c == class)
}

fn is_list(element: ElementRef<'_>) -> bool {
    matches!(element.value().name(), "ul" | "ol" | "dl")
}

fn nested_in_list(element: ElementRef<'_>) -> bool {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .any(is_list)
}

/// Reports an `<error code info>` element as an API error
fn api_error(document: &Html) -> ParseResult<()> {
    let error_selector = selector("error[code]")?;
    match document.select(&error_selector).next() {
        Some(error) => Err(ParseError::Api {
            code: error.value().attr("code").unwrap_or_default().to_string(),
            info: error.value().attr("info").unwrap_or_default().to_string(),
        }),
        None => Ok(()),
    }
}

impl WikiParser {
    /// Creates a parser resolving relative links against `base_url`
    pub fn new(base_url: Url) -> Self {
        Self { base_url }
    }

    /// Resolves a link to an absolute URL
    fn absolute(&self, href: &str) -> ParseResult<String> {
        self.base_url
            .join(href.trim())
            .map(|url| url.to_string())
            .map_err(|_| ParseError::InvalidUrl(href.to_string()))
    }

    /// Extracts the page key from an internal wiki link
    ///
    /// Returns None for external links and links without a `title` query.
    fn page_key(&self, href: &str) -> Option<String> {
        let url = self.base_url.join(href.trim()).ok()?;
        if url.host_str() != self.base_url.host_str() {
            return None;
        }

        url.query_pairs()
            .find(|(name, _)| name == "title")
            .map(|(_, value)| value.into_owned())
            .filter(|value| !value.is_empty())
    }
}

impl DocumentParser for WikiParser {
    fn parse_page_metadata(&self, page: &str, document: &str) -> ParseResult<PageModel> {
        let document = Html::parse_document(document);
        api_error(&document)?;

        let page_selector = selector("page[title]")?;
        let element = document
            .select(&page_selector)
            .next()
            .ok_or_else(|| ParseError::MissingElement {
                element: "page",
                context: format!("page info for {}", page),
            })?;

        if element.value().attr("missing").is_some() {
            return Err(ParseError::MissingPage(page.to_string()));
        }

        let mut model = PageModel::new(page, PageType::Other);
        if let Some(title) = element.value().attr("title") {
            model.title = title.to_string();
        }

        model.last_update = element
            .value()
            .attr("touched")
            .map(|touched| {
                touched
                    .parse::<DateTime<Utc>>()
                    .map_err(|source| ParseError::InvalidTimestamp {
                        value: touched.to_string(),
                        source,
                    })
            })
            .transpose()?;

        Ok(model)
    }

    fn parse_listing(&self, document: &str) -> ParseResult<Vec<PageModel>> {
        let document = Html::parse_document(document);

        let nav_selector = selector("#p-Light_Novels")?;
        let nav = document
            .select(&nav_selector)
            .next()
            .ok_or_else(|| ParseError::MissingElement {
                element: "#p-Light_Novels",
                context: "novel listing".to_string(),
            })?;

        let link_selector = selector("li a[href]")?;
        let mut novels: Vec<PageModel> = Vec::new();

        for link in nav.select(&link_selector) {
            let Some(key) = link.value().attr("href").and_then(|href| self.page_key(href)) else {
                continue;
            };
            if novels.iter().any(|novel| novel.page == key) {
                continue;
            }

            let mut novel = PageModel::new(key, PageType::Novel);
            let title = text_of(link);
            if !title.is_empty() {
                novel.title = title;
            }
            novels.push(novel);
        }

        Ok(novels)
    }

    fn parse_details(&self, page: &str, document: &str) -> ParseResult<NovelCollectionModel> {
        let document = Html::parse_document(document);

        let content_selector = selector("#mw-content-text")?;
        let content = document
            .select(&content_selector)
            .next()
            .ok_or_else(|| ParseError::MissingElement {
                element: "#mw-content-text",
                context: format!("details of {}", page),
            })?;

        let mut novel = NovelCollectionModel::new(page);

        let paragraph_selector = selector("p")?;
        novel.synopsis = content
            .select(&paragraph_selector)
            .map(text_of)
            .find(|text| !text.is_empty())
            .unwrap_or_default();

        let cover_selector = selector("a.image")?;
        let img_selector = selector("img[src]")?;
        let cover = content.select(&cover_selector).find_map(|link| {
            let src = link.select(&img_selector).next()?.value().attr("src")?;
            Some((src, link.value().attr("href")))
        });
        if let Some((src, href)) = cover {
            novel.cover_url = Some(self.absolute(src)?);
            novel.cover_referer = href.map(str::to_string);
        }

        let structure_selector = selector("h3, ul, ol, dl")?;
        let headline_selector = selector(".mw-headline")?;
        let link_selector = selector("a[href]")?;

        for element in content.select(&structure_selector) {
            if element.value().name() == "h3" {
                let title = element
                    .select(&headline_selector)
                    .next()
                    .map(text_of)
                    .unwrap_or_else(|| text_of(element));
                novel.books.push(BookModel {
                    title,
                    position: novel.books.len() as u32,
                    chapters: Vec::new(),
                });
                continue;
            }

            if nested_in_list(element) {
                continue;
            }
            // Lists before the first heading (table of contents) belong to no book
            let Some(book) = novel.books.last_mut() else {
                continue;
            };

            for link in element.select(&link_selector) {
                if has_class(link, "new") {
                    continue;
                }
                let Some(key) = link.value().attr("href").and_then(|href| self.page_key(href))
                else {
                    continue;
                };

                let mut chapter = PageModel::new(key, PageType::Content).with_parent(page);
                let title = text_of(link);
                if !title.is_empty() {
                    chapter.title = title;
                }
                book.chapters.push(chapter);
            }
        }

        Ok(novel)
    }

    fn parse_content(&self, page: &str, document: &str) -> ParseResult<NovelContentModel> {
        let document = Html::parse_document(document);
        api_error(&document)?;

        let parse_selector = selector("parse")?;
        let text_selector = selector("parse > text")?;

        let parse = document.select(&parse_selector).next();
        let body = document
            .select(&text_selector)
            .next()
            .map(|text| text.text().collect::<String>())
            .ok_or_else(|| ParseError::MissingElement {
                element: "parse > text",
                context: format!("content of {}", page),
            })?;

        let mut owner = PageModel::new(page, PageType::Content);
        if let Some(title) = parse.and_then(|p| p.value().attr("title")) {
            owner.title = title.to_string();
        }

        let fragment = Html::parse_fragment(&body);
        let link_selector = selector("a.image[href]")?;
        let img_selector = selector("img[src]")?;

        let mut images = Vec::new();
        for link in fragment.select(&link_selector) {
            let Some(src) = link
                .select(&img_selector)
                .next()
                .and_then(|img| img.value().attr("src"))
            else {
                continue;
            };
            let referer = link.value().attr("href").unwrap_or_default();
            images.push(ImageModel::new(self.absolute(src)?).with_referer(referer));
        }

        let mut content = NovelContentModel::new(owner, body);
        content.images = images;
        Ok(content)
    }

    fn parse_image_page(&self, document: &str) -> ParseResult<String> {
        let document = Html::parse_document(document);

        for css in [".fullImageLink a[href]", ".fullMedia a[href]"] {
            let link_selector = selector(css)?;
            if let Some(href) = document
                .select(&link_selector)
                .next()
                .and_then(|link| link.value().attr("href"))
            {
                return self.absolute(href);
            }
        }

        Err(ParseError::MissingElement {
            element: ".fullImageLink a",
            context: "image page".to_string(),
        })
    }
}
