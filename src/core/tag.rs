// Hierarchical gameplay tags used to name input slots

use std::fmt;
use std::rc::Rc;

/// Dotted semantic name such as `Input.Move.KM`
///
/// The empty tag is the "none" tag and is never valid as a binding key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct GameplayTag(Rc<str>);

impl GameplayTag {
    /// Create a tag from its dotted name
    pub fn new(name: &str) -> Self {
        Self(Rc::from(name.trim()))
    }

    /// The "none" tag
    pub fn none() -> Self {
        Self::default()
    }

    /// Check that the tag names something
    pub fn is_valid(&self) -> bool {
        !self.0.is_empty()
    }

    /// Dotted name of the tag
    pub fn name(&self) -> &str {
        &self.0
    }

    /// Check whether `self` equals `parent` or sits below it in the hierarchy
    pub fn matches(&self, parent: &GameplayTag) -> bool {
        if !self.is_valid() || !parent.is_valid() {
            return false;
        }
        self.0.as_ref() == parent.0.as_ref()
            || self
                .0
                .strip_prefix(parent.0.as_ref())
                .is_some_and(|rest| rest.starts_with('.'))
    }
}

impl fmt::Display for GameplayTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for GameplayTag {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_validity() {
        assert!(GameplayTag::new("Input.Jump").is_valid());
        assert!(!GameplayTag::none().is_valid());
        assert!(!GameplayTag::new("   ").is_valid());
    }

    #[test]
    fn test_tag_equality_by_name() {
        assert_eq!(GameplayTag::new("Input.Jump"), GameplayTag::from("Input.Jump"));
        assert_ne!(GameplayTag::new("Input.Jump"), GameplayTag::new("Input.Crouch"));
    }

    #[test]
    fn test_tag_hierarchy() {
        let tag = GameplayTag::new("Input.Move.KM");
        assert!(tag.matches(&GameplayTag::new("Input.Move")));
        assert!(tag.matches(&GameplayTag::new("Input")));
        assert!(!tag.matches(&GameplayTag::new("Input.Mo")));
        assert!(!tag.matches(&GameplayTag::none()));
    }
}
