use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Primary key of a user record as stored in a stamp column.
///
/// Integer keys cover auto-increment user tables, text keys cover external
/// identity providers (`"user_2ab..."`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum ActorId {
    Int(i64),
    Text(String),
}

impl ActorId {
    /// Returns the integer key, if this is an integer id.
    #[must_use]
    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(id) => Some(*id),
            Self::Text(_) => None,
        }
    }

    /// Returns the text key, if this is a text id.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Int(_) => None,
            Self::Text(id) => Some(id),
        }
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(id) => write!(f, "{id}"),
            Self::Text(id) => f.write_str(id),
        }
    }
}

impl From<i64> for ActorId {
    fn from(id: i64) -> Self {
        Self::Int(id)
    }
}

impl From<i32> for ActorId {
    fn from(id: i32) -> Self {
        Self::Int(i64::from(id))
    }
}

impl From<&str> for ActorId {
    fn from(id: &str) -> Self {
        Self::Text(id.to_string())
    }
}

impl From<String> for ActorId {
    fn from(id: String) -> Self {
        Self::Text(id)
    }
}

/// Authenticated actor on whose behalf a change is made.
///
/// Produced by the host application's authentication layer and passed
/// explicitly into each lifecycle call. Contains only data fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Actor {
    /// Key of the actor's user record.
    pub id: ActorId,
    /// Display name, for log output only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Actor {
    #[must_use]
    pub fn new(id: impl Into<ActorId>) -> Self {
        Self {
            id: id.into(),
            name: None,
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// Anything that identifies a user record by key.
///
/// Query filters accept any implementor, so callers can pass an `Actor`,
/// a bare `ActorId`, or a loaded user row.
pub trait AsActorId {
    fn actor_id(&self) -> ActorId;
}

impl AsActorId for ActorId {
    fn actor_id(&self) -> ActorId {
        self.clone()
    }
}

impl AsActorId for Actor {
    fn actor_id(&self) -> ActorId {
        self.id.clone()
    }
}

impl AsActorId for i64 {
    fn actor_id(&self) -> ActorId {
        ActorId::Int(*self)
    }
}

impl AsActorId for str {
    fn actor_id(&self) -> ActorId {
        ActorId::Text(self.to_string())
    }
}

impl<T: AsActorId + ?Sized> AsActorId for &T {
    fn actor_id(&self) -> ActorId {
        (**self).actor_id()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn actor_id_serializes_untagged() {
        assert_eq!(serde_json::to_string(&ActorId::Int(7)).unwrap(), "7");
        assert_eq!(
            serde_json::to_string(&ActorId::from("user_1")).unwrap(),
            "\"user_1\""
        );
        let parsed: ActorId = serde_json::from_str("42").unwrap();
        assert_eq!(parsed, ActorId::Int(42));
        let parsed: ActorId = serde_json::from_str("\"user_x\"").unwrap();
        assert_eq!(parsed, ActorId::Text("user_x".to_string()));
    }

    #[test]
    fn actor_id_display() {
        assert_eq!(ActorId::Int(9).to_string(), "9");
        assert_eq!(ActorId::from("abc").to_string(), "abc");
    }

    #[test]
    fn actor_exposes_its_id() {
        let actor = Actor::new(7).with_name("ada");
        assert_eq!(actor.actor_id(), ActorId::Int(7));
        assert_eq!((&actor).actor_id(), ActorId::Int(7));
        assert_eq!(actor.name.as_deref(), Some("ada"));
    }

    #[test]
    fn accessors_match_variant() {
        assert_eq!(ActorId::Int(3).as_int(), Some(3));
        assert_eq!(ActorId::Int(3).as_text(), None);
        assert_eq!(ActorId::from("u").as_text(), Some("u"));
        assert_eq!(ActorId::from("u").as_int(), None);
    }
}
