use crate::config::preset;
use crate::error::Error;
use crate::policy::Policy;

lazy_static! {
    pub static ref BASIC_POLICY: Policy = preset(basic);
    pub static ref BASIC_WITH_IMAGES_POLICY: Policy = preset(basic_with_images);
}

fn basic() -> Result<Policy, Error> {
    let mut policy = Policy::new();
    policy
        .add_tags(&[
            "a",
            "b",
            "blockquote",
            "br",
            "cite",
            "code",
            "dd",
            "dl",
            "dt",
            "em",
            "i",
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
            "u",
            "ul",
        ])?
        .add_attributes("a", &["href"])?
        .add_attributes("blockquote", &["cite"])?
        .add_attributes("q", &["cite"])?
        .add_protocols("a", "href", &["ftp", "http", "https", "mailto"])?
        .add_protocols("blockquote", "cite", &["http", "https"])?
        .add_protocols("cite", "cite", &["http", "https"])?
        .add_protocols("q", "cite", &["http", "https"])?
        .add_enforced_attribute("a", "rel", "nofollow")?;
    Ok(policy)
}

fn basic_with_images() -> Result<Policy, Error> {
    let mut policy = basic()?;
    policy
        .add_tags(&["img"])?
        .add_attributes("img", &["align", "alt", "height", "src", "title", "width"])?
        .add_protocols("img", "src", &["http", "https"])?;
    Ok(policy)
}
