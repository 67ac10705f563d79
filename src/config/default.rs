use std::collections::HashSet;

use html5ever::LocalName;

use crate::policy::Policy;

lazy_static! {
    pub static ref NONE_POLICY: Policy = Policy::new();
    /// Disallowed tags whose content is never safe to surface as text. They are removed together
    /// with their content instead of being unwrapped.
    pub static ref OPAQUE_TAGS: HashSet<LocalName> = hashset! {
        local_name!("iframe"),
        local_name!("noembed"),
        local_name!("noframes"),
        local_name!("noscript"),
        local_name!("script"),
        local_name!("style"),
        local_name!("template"),
    };
}
