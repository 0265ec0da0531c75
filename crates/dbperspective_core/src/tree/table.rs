use super::{NodeIcon, PerspectiveNode, defaults};
use crate::error::PerspectiveError;
use crate::load_request::PerspectiveDataLoadProps;
use crate::schema::SchemaObject;
use std::borrow::Cow;

/// A table or view, either as the perspective root or as the far end of a
/// reference or custom join.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TableNode<'t> {
    pub object: SchemaObject<'t>,
}

impl<'t> TableNode<'t> {
    pub fn new(object: SchemaObject<'t>) -> Self {
        Self { object }
    }

    /// `schema:name`, or the bare name for schema-less databases.
    pub fn code_name(&self) -> Cow<'t, str> {
        match self.object.schema() {
            Some(schema) => Cow::Owned(format!("{}:{}", schema, self.object.name())),
            None => Cow::Borrowed(self.object.name()),
        }
    }

    pub fn title(&self) -> &'t str {
        self.object.name()
    }

    pub fn icon(&self) -> NodeIcon {
        if self.object.is_view() {
            NodeIcon::View
        } else {
            NodeIcon::Table
        }
    }

    pub fn table_code(&self) -> String {
        self.object.table_code()
    }

    pub(super) fn node_load_props(
        &self,
        node: &'t PerspectiveNode<'t>,
    ) -> Result<PerspectiveDataLoadProps, PerspectiveError> {
        defaults::load_props(node, self.object, None)
    }
}
