use crate::config::preset;
use crate::error::Error;
use crate::policy::Policy;

lazy_static! {
    pub static ref SIMPLE_TEXT_POLICY: Policy = preset(simple_text);
}

fn simple_text() -> Result<Policy, Error> {
    let mut policy = Policy::new();
    policy.add_tags(&["b", "em", "i", "strong", "u"])?;
    Ok(policy)
}
