//! Cached representation shared by resource and collection handles

use ledgerbridge_domain::{MediaType, Result};

use crate::document::{self, ParsedDocument};

/// Raw body, listing-derived partial body and the document parsed from
/// whichever of the two is authoritative.
#[derive(Debug, Default)]
pub(crate) struct Representation {
    /// Body of the last full fetch (or of the last write)
    pub data: Option<String>,
    /// Element body copied out of a parent listing
    pub partial: Option<String>,
    pub document: Option<ParsedDocument>,
    /// The document holds edits not yet written back
    pub dirty: bool,
}

impl Representation {
    pub fn with_data(data: Option<String>) -> Self {
        Self { data, ..Self::default() }
    }

    pub fn with_partial(partial: Option<String>) -> Self {
        Self { partial, ..Self::default() }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_none() && self.partial.is_none() && self.document.is_none()
    }

    /// Full data has been fetched (or written) since the last refresh.
    pub fn is_complete(&self) -> bool {
        self.data.is_some()
    }

    pub fn store(&mut self, body: String) {
        self.data = Some(body);
        self.partial = None;
        self.document = None;
        self.dirty = false;
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Parse the document lazily. `None` when there is nothing to parse.
    ///
    /// `root_key_hint` names the envelope key for bodies that carry none,
    /// such as elements copied out of a JSON listing.
    pub fn document(
        &mut self,
        media_type: &MediaType,
        root_key_hint: Option<&str>,
    ) -> Result<Option<&mut ParsedDocument>> {
        if self.document.is_none() {
            let Some(body) = self.data.as_deref().or(self.partial.as_deref()) else {
                return Ok(None);
            };
            let mut parsed = document::parse(body, media_type)?;
            if parsed.root_key.is_none() {
                parsed.root_key = root_key_hint.map(str::to_string);
            }
            self.document = Some(parsed);
        }
        Ok(self.document.as_mut())
    }

    /// Body to send on a write: the edited document when there is one,
    /// otherwise the cached body re-wrapped under the root key.
    pub fn body(&mut self, media_type: &MediaType, root_key_hint: Option<&str>) -> Result<Option<String>> {
        match self.document(media_type, root_key_hint)? {
            Some(parsed) => parsed.serialize().map(Some),
            None => Ok(None),
        }
    }
}
