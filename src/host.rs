//! Script host abstraction.
//!
//! The loader never touches the document or the global object directly.
//! A `ScriptHost` answers "is the tag there", "is the provider namespace
//! installed", and wires a completion to the script's callback/error event.

use crate::config::ScriptRequest;
use crate::error::LoadError;

/// Invoked by the host with the outcome of a script load.
pub type Completion<A> = Box<dyn FnOnce(Result<A, LoadError>)>;

/// Environment that can insert and observe the provider script.
///
/// Hosts must invoke a completion at most once. If `insert_script` or
/// `attach_existing` returns `Err`, the completion must not be invoked.
pub trait ScriptHost: 'static {
    /// Handle to the provider namespace. Clones refer to the same object.
    type Api: Clone + 'static;

    /// Whether an element with this id is already in the document.
    fn script_exists(&self, id: &str) -> bool;

    /// The provider namespace, if the script has already run.
    fn provider_api(&self) -> Option<Self::Api>;

    /// Claim the global callback, insert the script element, and report its outcome.
    fn insert_script(
        &self,
        request: &ScriptRequest,
        done: Completion<Self::Api>,
    ) -> Result<(), LoadError>;

    /// Report the outcome of a script element that someone else inserted.
    fn attach_existing(
        &self,
        request: &ScriptRequest,
        done: Completion<Self::Api>,
    ) -> Result<(), LoadError>;

    /// Remove a stale script element before a manual retry.
    fn remove_script(&self, id: &str);
}
