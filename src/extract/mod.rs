use crate::config::SelectorConfig;
use crate::results::{ItemReference, ProductRecord};
use scraper::{ElementRef, Html, Selector};
use url::Url;


/// Placeholder recorded when no price element is present
pub const PRICE_UNAVAILABLE: &str = "Price not available";
/// Placeholder recorded when no product image is present
pub const IMAGE_UNAVAILABLE: &str = "No image available";
/// Placeholder recorded when the breadcrumb trail yields no category
pub const UNCATEGORIZED: &str = "Uncategorized";

/// Enum to represent the ways a field value is pulled out of a page
#[derive(Debug, Clone)]
pub enum FieldRule {
    /// Whitespace-normalized text of the first matching element
    Text { css: String },
    /// An attribute of the first matching element
    Attr { css: String, attr: String },
    /// Element text with a label stripped and a prefix added
    Code {
        css: String,
        strip: String,
        prefix: String,
    },
    /// First breadcrumb link whose text differs from the root label
    Breadcrumb { css: String, root: String },
    /// Price taken from an attribute and rendered as a dollar amount
    PriceValue { css: String, attr: String },
    /// Promotional price assembled from split dollar and cent elements
    PromoPrice {
        mark: String,
        dollars: String,
        cents: String,
    },
}

impl FieldRule {
    /// Applies the rule to a parsed document, returning the value if the
    /// page carries one
    fn apply(&self, doc: &Html) -> Option<String> {
        match self {
            FieldRule::Text { css } => first_match(doc, css).map(collect_text),
            FieldRule::Attr { css, attr } => first_match(doc, css)
                .and_then(|el| el.value().attr(attr))
                .map(|v| v.to_string()),
            FieldRule::Code { css, strip, prefix } => first_match(doc, css)
                .map(collect_text)
                .map(|text| format!("{}{}", prefix, text.replace(strip.as_str(), ""))),
            FieldRule::Breadcrumb { css, root } => {
                let selector = compile(css)?;
                doc.select(&selector)
                    .map(collect_text)
                    .find(|label| label != root)
            }
            FieldRule::PriceValue { css, attr } => first_match(doc, css)
                .and_then(|el| el.value().attr(attr))
                .map(|value| format!("${}", value)),
            FieldRule::PromoPrice {
                mark,
                dollars,
                cents,
            } => {
                let mark_el = first_match(doc, mark)?;
                let whole = collect_text(first_in(mark_el, dollars)?);
                let frac = collect_text(first_in(mark_el, cents)?).replace('.', "");
                Some(format!("${}.{}", whole, frac))
            }
        }
    }
}

/// What to record when none of a field's rules produce a value
#[derive(Debug, Clone)]
enum FieldFallback {
    /// The record is dropped
    Required,
    /// The placeholder stands in for the value
    Sentinel(String),
}

/// A field's rule chain plus its missing-value policy
#[derive(Debug, Clone)]
pub struct FieldSpec {
    rules: Vec<FieldRule>,
    fallback: FieldFallback,
}

impl FieldSpec {
    fn required(rule: FieldRule) -> Self {
        Self {
            rules: vec![rule],
            fallback: FieldFallback::Required,
        }
    }

    fn with_sentinel(rules: Vec<FieldRule>, sentinel: &str) -> Self {
        Self {
            rules,
            fallback: FieldFallback::Sentinel(sentinel.to_string()),
        }
    }

    /// Tries each rule in order; None only for required fields with no value
    pub fn resolve(&self, doc: &Html) -> Option<String> {
        for rule in &self.rules {
            if let Some(value) = rule.apply(doc) {
                return Some(value);
            }
        }
        match &self.fallback {
            FieldFallback::Required => None,
            FieldFallback::Sentinel(placeholder) => Some(placeholder.clone()),
        }
    }
}

/// Field rules for every column of a product record
#[derive(Debug, Clone)]
pub struct RecordSpecs {
    pub title: FieldSpec,
    pub upc: FieldSpec,
    pub category: FieldSpec,
    pub location: FieldSpec,
    pub price: FieldSpec,
    pub image: FieldSpec,
}

impl RecordSpecs {
    pub fn from_selectors(selectors: &SelectorConfig) -> Self {
        Self {
            title: FieldSpec::required(FieldRule::Text {
                css: selectors.product_title.clone(),
            }),
            upc: FieldSpec::with_sentinel(
                vec![FieldRule::Code {
                    css: selectors.product_upc.clone(),
                    strip: "UPC: ".to_string(),
                    prefix: "#".to_string(),
                }],
                "",
            ),
            category: FieldSpec::with_sentinel(
                vec![FieldRule::Breadcrumb {
                    css: selectors.breadcrumb.clone(),
                    root: selectors.breadcrumb_root.clone(),
                }],
                UNCATEGORIZED,
            ),
            location: FieldSpec::with_sentinel(
                vec![FieldRule::Text {
                    css: selectors.product_location.clone(),
                }],
                "",
            ),
            price: FieldSpec::with_sentinel(
                vec![
                    FieldRule::PriceValue {
                        css: selectors.price_value.clone(),
                        attr: "value".to_string(),
                    },
                    FieldRule::PromoPrice {
                        mark: selectors.promo_mark.clone(),
                        dollars: selectors.promo_dollars.clone(),
                        cents: selectors.promo_cents.clone(),
                    },
                ],
                PRICE_UNAVAILABLE,
            ),
            image: FieldSpec::with_sentinel(
                vec![FieldRule::Attr {
                    css: selectors.product_image.clone(),
                    attr: "src".to_string(),
                }],
                IMAGE_UNAVAILABLE,
            ),
        }
    }
}

/// Builds a product record from a detail page, or None when the page has
/// no product title
pub fn product_from_html(
    html: &str,
    specs: &RecordSpecs,
    reference: ItemReference,
) -> Option<ProductRecord> {
    let doc = Html::parse_document(html);
    let title = specs.title.resolve(&doc)?;

    Some(ProductRecord {
        upc: specs.upc.resolve(&doc).unwrap_or_default(),
        category: specs.category.resolve(&doc).unwrap_or_default(),
        title,
        location: specs.location.resolve(&doc).unwrap_or_default(),
        price: specs.price.resolve(&doc).unwrap_or_default(),
        image_url: specs.image.resolve(&doc).unwrap_or_default(),
        reference,
    })
}

/// Collects the first anchor href out of every result cell, resolved
/// against the page origin with fragments dropped
pub fn grid_references(html: &str, cell_css: &str, base: &Url) -> Vec<Url> {
    let doc = Html::parse_document(html);

    let cell_selector = match compile(cell_css) {
        Some(selector) => selector,
        None => return Vec::new(),
    };
    let anchor_selector = Selector::parse("a").unwrap();

    let mut references = Vec::new();
    for cell in doc.select(&cell_selector) {
        let href = cell
            .select(&anchor_selector)
            .find_map(|a| a.value().attr("href"));
        let href = match href {
            Some(href) => href,
            None => continue,
        };
        match base.join(href) {
            Ok(mut url) => {
                url.set_fragment(None);
                references.push(url);
            }
            Err(err) => ::log::debug!("Skipping malformed href {}: {}", href, err),
        }
    }

    ::log::debug!("Grid parser found {} references", references.len());
    references
}

/// First element matching a configured selector, with bad selectors
/// logged and treated as no match
fn first_match<'a>(doc: &'a Html, css: &str) -> Option<ElementRef<'a>> {
    let selector = compile(css)?;
    doc.select(&selector).next()
}

fn first_in<'a>(scope: ElementRef<'a>, css: &str) -> Option<ElementRef<'a>> {
    let selector = compile(css)?;
    scope.select(&selector).next()
}

fn compile(css: &str) -> Option<Selector> {
    match Selector::parse(css) {
        Ok(selector) => Some(selector),
        Err(err) => {
            ::log::warn!("Invalid selector {:?}: {}", css, err);
            None
        }
    }
}

fn collect_text(el: ElementRef<'_>) -> String {
    el.text()
        .collect::<Vec<_>>()
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
