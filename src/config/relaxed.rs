use crate::config::preset;
use crate::error::Error;
use crate::policy::Policy;

lazy_static! {
    pub static ref RELAXED_POLICY: Policy = preset(relaxed);
}

fn relaxed() -> Result<Policy, Error> {
    let mut policy = Policy::new();
    policy
        .add_tags(&[
            "a",
            "b",
            "blockquote",
            "br",
            "caption",
            "cite",
            "code",
            "col",
            "colgroup",
            "dd",
            "div",
            "dl",
            "dt",
            "em",
            "h1",
            "h2",
            "h3",
            "h4",
            "h5",
            "h6",
            "i",
            "img",
            "li",
            "ol",
            "p",
            "pre",
            "q",
            "small",
            "span",
            "strike",
            "strong",
            "sub",
            "sup",
            "table",
            "tbody",
            "td",
            "tfoot",
            "th",
            "thead",
            "tr",
            "u",
            "ul",
        ])?
        .add_attributes("a", &["href", "title"])?
        .add_attributes("blockquote", &["cite"])?
        .add_attributes("col", &["span", "width"])?
        .add_attributes("colgroup", &["span", "width"])?
        .add_attributes("img", &["align", "alt", "height", "src", "title", "width"])?
        .add_attributes("ol", &["start", "type"])?
        .add_attributes("q", &["cite"])?
        .add_attributes("table", &["summary", "width"])?
        .add_attributes("td", &["abbr", "axis", "colspan", "rowspan", "width"])?
        .add_attributes(
            "th",
            &["abbr", "axis", "colspan", "rowspan", "scope", "width"],
        )?
        .add_attributes("ul", &["type"])?
        .add_protocols("a", "href", &["ftp", "http", "https", "mailto"])?
        .add_protocols("blockquote", "cite", &["http", "https"])?
        .add_protocols("cite", "cite", &["http", "https"])?
        .add_protocols("img", "src", &["http", "https"])?
        .add_protocols("q", "cite", &["http", "https"])?;
    Ok(policy)
}
