//! Entry point tying the inspector, server info and both directions together.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::decoder;
use crate::encoder::{encode_payload, EncodeOptions};
use crate::error::{DecodeError, EncodeError};
use crate::inspector::TypeInspector;
use crate::legacy;
use crate::naming::NamingConfig;
use crate::record::{Payload, Resource};
use crate::types::{Document, ServerInfo};

/// Encoder/decoder with a shared schema cache.
///
/// A `Codec` is `Send + Sync`; one instance can serve many threads.
///
/// ```
/// use jsonapi_codec::{Codec, NamingConfig, ServerInfo};
///
/// let codec = Codec::new(NamingConfig::default().with_initialism("SKU"))
///     .with_server(ServerInfo::new("https://api.example.com", "v1"));
/// assert_eq!(codec.server().unwrap().root(), "https://api.example.com/v1");
/// ```
#[derive(Debug, Default)]
pub struct Codec {
    inspector: TypeInspector,
    server: Option<ServerInfo>,
}

impl Codec {
    pub fn new(naming: NamingConfig) -> Self {
        Self {
            inspector: TypeInspector::new(naming),
            server: None,
        }
    }

    /// Generate links against this server.
    pub fn with_server(mut self, server: ServerInfo) -> Self {
        self.server = Some(server);
        self
    }

    pub fn inspector(&self) -> &TypeInspector {
        &self.inspector
    }

    pub fn naming(&self) -> &NamingConfig {
        self.inspector.naming()
    }

    pub fn server(&self) -> Option<&ServerInfo> {
        self.server.as_ref()
    }

    pub fn encode<T: Resource>(&self, record: &T) -> Result<Document, EncodeError> {
        self.encode_payload(Payload::one(record))
    }

    pub fn encode_many<T: Resource>(&self, records: &[T]) -> Result<Document, EncodeError> {
        self.encode_payload(Payload::many(records))
    }

    pub fn encode_payload(&self, payload: Payload<'_>) -> Result<Document, EncodeError> {
        self.encode_with(payload, &EncodeOptions::default())
    }

    /// Encode with top-level links and meta.
    pub fn encode_with(
        &self,
        payload: Payload<'_>,
        options: &EncodeOptions,
    ) -> Result<Document, EncodeError> {
        encode_payload(payload, &self.inspector, self.server.as_ref(), options)
    }

    pub fn decode<T: Resource>(&self, raw: &str, target: &mut T) -> Result<(), DecodeError> {
        decoder::decode(raw, target, &self.inspector)
    }

    pub fn decode_many<T: Resource>(
        &self,
        raw: &str,
        target: &mut Vec<T>,
    ) -> Result<(), DecodeError> {
        decoder::decode_many(raw, target, &self.inspector)
    }

    pub fn decode_document<T: Resource>(
        &self,
        document: &Document,
        target: &mut T,
    ) -> Result<(), DecodeError> {
        decoder::decode_document(document, target, &self.inspector)
    }

    pub fn decode_document_many<T: Resource>(
        &self,
        document: &Document,
        target: &mut Vec<T>,
    ) -> Result<(), DecodeError> {
        decoder::decode_document_many(document, target, &self.inspector)
    }

    /// Encode a plain serde value by convention. See [`crate::legacy`].
    pub fn encode_legacy<T: Serialize + ?Sized>(&self, value: &T) -> Result<Document, EncodeError> {
        legacy::encode_legacy(value, &self.inspector, self.server.as_ref())
    }

    pub fn decode_legacy<T>(&self, raw: &str, target: &mut T) -> Result<(), DecodeError>
    where
        T: Serialize + DeserializeOwned,
    {
        legacy::decode_legacy(raw, target, &self.inspector)
    }

    pub fn decode_legacy_many<T>(&self, raw: &str, target: &mut Vec<T>) -> Result<(), DecodeError>
    where
        T: Serialize + DeserializeOwned + Default,
    {
        legacy::decode_legacy_many(raw, target, &self.inspector)
    }
}
