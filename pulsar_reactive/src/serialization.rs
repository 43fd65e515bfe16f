#![forbid(unsafe_code)]
use serde::{de::DeserializeOwned, Serialize};
use std::rc::Rc;
use thiserror::Error;

/// Describes errors that can occur while serializing and deserializing
/// reactive state, typically while producing or consuming a boot snapshot.
#[derive(Debug, Clone, Error)]
pub enum SerializationError {
    /// Errors that occur during serialization.
    #[error("error serializing reactive state: {0}")]
    Serialize(Rc<dyn std::error::Error>),
    /// Errors that occur during deserialization.
    #[error("error deserializing reactive state: {0}")]
    Deserialize(Rc<dyn std::error::Error>),
}

/// Describes an object that can round-trip through JSON.
///
/// This is the codec used by serializable signals to participate in the SSR
/// handshake (`dump`/`boot`). It is blanket-implemented for everything that
/// implements serde's `Serialize` and `DeserializeOwned`.
pub trait Serializable
where
    Self: Sized,
{
    /// Serializes the object to JSON.
    fn to_json(&self) -> Result<String, SerializationError>;

    /// Deserializes the object from JSON.
    fn from_json(json: &str) -> Result<Self, SerializationError>;
}

impl<T> Serializable for T
where
    T: Serialize + DeserializeOwned,
{
    fn to_json(&self) -> Result<String, SerializationError> {
        serde_json::to_string(self)
            .map_err(|e| SerializationError::Serialize(Rc::new(e)))
    }

    fn from_json(json: &str) -> Result<Self, SerializationError> {
        serde_json::from_str(json)
            .map_err(|e| SerializationError::Deserialize(Rc::new(e)))
    }
}
