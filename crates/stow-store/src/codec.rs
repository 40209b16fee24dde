//! The serialization contract for stored values.
//!
//! The store never inspects value bytes. A value type decides its own
//! encoding by implementing [`Serializable`]; schema evolution is the value
//! type's responsibility.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::StoreResult;

/// A value that can be written to and read back from a store.
pub trait Serializable {
    /// Encode the value into bytes.
    ///
    /// Fails with [`StoreError::Serialization`](crate::StoreError::Serialization)
    /// when the value's internal state cannot be encoded.
    fn serialize(&self) -> StoreResult<Vec<u8>>;

    /// Replace the value's contents with the decoded `data`.
    ///
    /// Fails with [`StoreError::Serialization`](crate::StoreError::Serialization)
    /// on malformed input.
    fn deserialize(&mut self, data: &[u8]) -> StoreResult<()>;
}

/// Raw bytes are stored verbatim.
impl Serializable for Vec<u8> {
    fn serialize(&self) -> StoreResult<Vec<u8>> {
        Ok(self.clone())
    }

    fn deserialize(&mut self, data: &[u8]) -> StoreResult<()> {
        self.clear();
        self.extend_from_slice(data);
        Ok(())
    }
}

/// Adapts any serde type to [`Serializable`] using JSON encoding.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Json<T>(pub T);

impl<T> Json<T> {
    /// Unwrap the inner value.
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> Serializable for Json<T>
where
    T: Serialize + DeserializeOwned,
{
    fn serialize(&self) -> StoreResult<Vec<u8>> {
        Ok(serde_json::to_vec(&self.0)?)
    }

    fn deserialize(&mut self, data: &[u8]) -> StoreResult<()> {
        self.0 = serde_json::from_slice(data)?;
        Ok(())
    }
}

/// Decoding slot used by typed reads that have no value to populate yet.
pub(crate) struct JsonSlot<T>(pub(crate) Option<T>);

impl<T: DeserializeOwned> Serializable for JsonSlot<T> {
    fn serialize(&self) -> StoreResult<Vec<u8>> {
        Err(crate::StoreError::Serialization(
            "decode-only slot cannot be encoded".into(),
        ))
    }

    fn deserialize(&mut self, data: &[u8]) -> StoreResult<()> {
        self.0 = Some(serde_json::from_slice(data)?);
        Ok(())
    }
}

/// Encode-only view used by typed writes to avoid cloning the value.
pub(crate) struct JsonRef<'a, T>(pub(crate) &'a T);

impl<T: Serialize> Serializable for JsonRef<'_, T> {
    fn serialize(&self) -> StoreResult<Vec<u8>> {
        Ok(serde_json::to_vec(self.0)?)
    }

    fn deserialize(&mut self, _data: &[u8]) -> StoreResult<()> {
        Err(crate::StoreError::Serialization(
            "encode-only view cannot be decoded".into(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde::Deserialize;

    #[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
    struct User {
        name: String,
        email: String,
    }

    #[test]
    fn json_encodes_as_plain_json() {
        let user = Json(User {
            name: "John".into(),
            email: "john@x.com".into(),
        });
        let bytes = user.serialize().unwrap();
        assert_eq!(bytes, br#"{"name":"John","email":"john@x.com"}"#);
    }

    #[test]
    fn json_deserialize_replaces_contents() {
        let mut user = Json(User::default());
        user.deserialize(br#"{"name":"Ann","email":"ann@x.com"}"#)
            .unwrap();
        assert_eq!(user.0.name, "Ann");
    }

    #[test]
    fn malformed_input_is_a_serialization_error() {
        let mut user = Json(User::default());
        let err = user.deserialize(b"{not json").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Serialization);
    }

    #[test]
    fn raw_bytes_deserialize_overwrites() {
        let mut buf = b"old contents".to_vec();
        buf.deserialize(b"new").unwrap();
        assert_eq!(buf, b"new");
    }
}
