// Handle<T> - shared ownership of one live native object
//
// A handle is either invalid (never created / released) or holds one
// reference on a live object. Dependents pin the object by cloning the
// inner Arc, so the native destroy call runs when the last holder lets go.
// Objects keep their dependencies as Arc fields: Drop::drop destroys the
// native object first, the dependency fields are dropped afterwards.

use std::fmt;
use std::sync::Arc;

use super::HandleError;

/// Native object kinds, used for log and error messages
pub trait NativeObject {
    const KIND: &'static str;
}

pub struct Handle<T: NativeObject> {
    object: Option<Arc<T>>,
}

impl<T: NativeObject> Handle<T> {
    pub(crate) fn new(object: T) -> Self {
        Self {
            object: Some(Arc::new(object)),
        }
    }

    /// A handle that represents nothing
    pub fn invalid() -> Self {
        Self { object: None }
    }

    pub fn is_valid(&self) -> bool {
        self.object.is_some()
    }

    /// Give up this handle's reference.
    ///
    /// Returns `true` if this call released something. Calling it again, or
    /// on an invalid handle, does nothing. The native object is destroyed
    /// once no dependent pins it any more.
    pub fn release(&mut self) -> bool {
        match self.object.take() {
            Some(object) => {
                log::debug!(
                    "Releasing {} handle ({} holders before release)",
                    T::KIND,
                    Arc::strong_count(&object)
                );
                true
            }
            None => false,
        }
    }

    /// Number of holders keeping the object alive (this handle included).
    /// Zero for an invalid handle.
    pub fn ref_count(&self) -> usize {
        self.object.as_ref().map_or(0, Arc::strong_count)
    }

    /// Take a counted reference for a dependent object
    pub(crate) fn pin(&self) -> Result<Arc<T>, HandleError> {
        self.object
            .as_ref()
            .map(Arc::clone)
            .ok_or(HandleError::DependencyUnavailable(T::KIND))
    }

    pub(crate) fn object(&self) -> Option<&T> {
        self.object.as_deref()
    }
}

impl<T: NativeObject> Default for Handle<T> {
    fn default() -> Self {
        Self::invalid()
    }
}

impl<T: NativeObject> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("kind", &T::KIND)
            .field("valid", &self.is_valid())
            .field("ref_count", &self.ref_count())
            .finish()
    }
}
