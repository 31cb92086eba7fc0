use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Layer or layer group as delivered by the data layer.
///
/// This is the mutable input form. Wrap it in a
/// [`LayerTree`](crate::store::LayerTree) to get the read-only view.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawLayer {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_visible: Option<bool>,
    /// `None` for data layers, `Some` (possibly empty) for groups. Order is
    /// the UI / z order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<RawLayer>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RawLayer {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_visible(mut self, visible: bool) -> Self {
        self.is_visible = Some(visible);
        self
    }

    pub fn with_children(mut self, children: Vec<RawLayer>) -> Self {
        self.children = Some(children);
        self
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// First layer with `id` in pre-order (this layer, then each child
    /// subtree in order).
    pub fn find_mut(&mut self, id: &str) -> Option<&mut RawLayer> {
        let path = self.path_to(id)?;
        let mut current = self;
        for index in path {
            let children = current.children.as_mut()?;
            current = children.get_mut(index)?;
        }
        Some(current)
    }

    /// Child positions leading from this layer to the first layer with `id`.
    fn path_to(&self, id: &str) -> Option<Vec<usize>> {
        let mut path: Vec<usize> = Vec::new();
        // (layer, depth, position among its siblings)
        let mut stack: Vec<(&RawLayer, usize, usize)> = vec![(self, 0, 0)];
        while let Some((layer, depth, position)) = stack.pop() {
            if depth > 0 {
                path.truncate(depth - 1);
                path.push(position);
            }
            if layer.id == id {
                return Some(path);
            }
            for (i, child) in layer.children.as_deref().unwrap_or_default().iter().enumerate().rev() {
                stack.push((child, depth + 1, i));
            }
        }
        None
    }
}
