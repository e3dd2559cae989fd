//! Transient screen state: open modal, form buffer, search query.
//!
//! Nothing here is persisted or shared; each screen owns its own
//! [`ViewState`].

use crate::gateway::Submission;
use crate::model::{Entity, ServerStatus, ServerStatusInput};

/// Which modal is open
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Modal {
    #[default]
    Closed,
    Add,
    Edit { id: String },
}

/// Entities whose search text contains `query`, case-insensitively.
/// An empty query matches everything. Order is preserved.
pub fn filter<'a, E: Entity>(list: &'a [E], query: &str) -> Vec<&'a E> {
    if query.is_empty() {
        return list.iter().collect();
    }
    let needle = query.to_lowercase();
    list.iter()
        .filter(|entity| {
            entity
                .search_text()
                .iter()
                .any(|text| text.to_lowercase().contains(&needle))
        })
        .collect()
}

/// List screen state for one entity type
#[derive(Debug, Clone)]
pub struct ViewState<E: Entity> {
    modal: Modal,
    form: E::Input,
    query: String,
}

impl<E: Entity> Default for ViewState<E> {
    fn default() -> Self {
        Self {
            modal: Modal::Closed,
            form: E::Input::default(),
            query: String::new(),
        }
    }
}

impl<E: Entity> ViewState<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn modal(&self) -> &Modal {
        &self.modal
    }

    pub fn form(&self) -> &E::Input {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut E::Input {
        &mut self.form
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
    }

    /// Visible rows of `list` under the current query
    pub fn visible<'a>(&self, list: &'a [E]) -> Vec<&'a E> {
        filter(list, &self.query)
    }

    /// Open the add modal with a default form
    pub fn open_add(&mut self) {
        self.modal = Modal::Add;
        self.form = E::Input::default();
    }

    /// Open the edit modal prefilled from `entity`
    pub fn open_edit(&mut self, entity: &E) {
        self.modal = Modal::Edit {
            id: entity.id().to_string(),
        };
        self.form = entity.to_input();
    }

    pub fn close(&mut self) {
        self.modal = Modal::Closed;
    }

    /// What submitting the open modal would send; `None` when closed
    pub fn submission(&self) -> Option<Submission<E::Input>> {
        match &self.modal {
            Modal::Closed => None,
            Modal::Add => Some(Submission::Add(self.form.clone())),
            Modal::Edit { id } => Some(Submission::Edit {
                id: id.clone(),
                input: self.form.clone(),
            }),
        }
    }

    /// Record the gateway's answer: the modal closes only on success
    pub fn finish<T, Err>(&mut self, result: &Result<T, Err>) {
        if result.is_ok() {
            self.close();
        }
    }
}

/// Server status form, seeded from the synchronized document
#[derive(Debug, Clone, Default)]
pub struct StatusEditor {
    form: ServerStatusInput,
    dirty: bool,
}

impl StatusEditor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the buffer with the stored document unless the operator has
    /// unsaved edits
    pub fn seed(&mut self, document: &ServerStatus) {
        if !self.dirty {
            self.form = ServerStatusInput::from(document);
        }
    }

    pub fn form(&self) -> &ServerStatusInput {
        &self.form
    }

    pub fn set_status(&mut self, status: impl Into<String>) {
        self.form.status = status.into();
        self.dirty = true;
    }

    pub fn set_message(&mut self, message: impl Into<String>) {
        self.form.message = message.into();
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Mark the buffer saved after a successful update
    pub fn finish<T, Err>(&mut self, result: &Result<T, Err>) {
        if result.is_ok() {
            self.dirty = false;
        }
    }
}
