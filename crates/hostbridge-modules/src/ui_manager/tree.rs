//! Shadow view tree mirrored from script-side rendering

use std::collections::{BTreeSet, HashMap};

use hostbridge_sdk::{Map, Value};

/// Errors raised by shadow tree operations
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TreeError {
    /// No view with this tag
    #[error("View {0} does not exist")]
    UnknownView(i64),

    /// Tag already in use
    #[error("View {0} already exists")]
    DuplicateTag(i64),

    /// Child index past the end
    #[error("Index {index} out of range for view {container} with {len} children")]
    #[allow(missing_docs)]
    IndexOutOfRange { container: i64, index: usize, len: usize },

    /// Paired index/tag arrays differ in length
    #[error("Mismatched {0} arrays")]
    Mismatched(&'static str),

    /// Child is attached elsewhere
    #[error("View {child} already has parent {parent}")]
    #[allow(missing_docs)]
    AlreadyParented { child: i64, parent: i64 },

    /// Child is the container or one of its ancestors
    #[error("View {child} cannot be attached below its own descendant {container}")]
    #[allow(missing_docs)]
    Cycle { child: i64, container: i64 },
}

/// Layout frame relative to the parent view
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[allow(missing_docs)]
pub struct Frame {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Frame {
    /// Create a frame
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Frame { x, y, width, height }
    }
}

/// One node of the shadow tree
#[derive(Debug, Clone, PartialEq)]
pub struct ShadowView {
    /// View tag
    pub tag: i64,
    /// Native view class
    pub view_name: String,
    /// Tag of the root view this view was created under
    pub root_tag: i64,
    /// Current props
    pub props: Map<String, Value>,
    /// Child tags in order
    pub children: Vec<i64>,
    /// Parent tag, once attached
    pub parent: Option<i64>,
    /// Last reported layout frame
    pub frame: Frame,
}

/// The shadow view tree.
#[derive(Debug, Default)]
pub struct ShadowTree {
    views: HashMap<i64, ShadowView>,
    roots: BTreeSet<i64>,
}

impl ShadowTree {
    /// Create an empty tree
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a view
    pub fn get(&self, tag: i64) -> Option<&ShadowView> {
        self.views.get(&tag)
    }

    /// Number of views
    pub fn len(&self) -> usize {
        self.views.len()
    }

    /// Check if there are no views
    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }

    /// Root view tags
    pub fn roots(&self) -> impl Iterator<Item = i64> + '_ {
        self.roots.iter().copied()
    }

    /// Fail if `child` is `container` or above it.
    fn check_acyclic(&self, container: i64, child: i64) -> Result<(), TreeError> {
        let mut current = Some(container);
        for _ in 0..=self.views.len() {
            let Some(tag) = current else { return Ok(()) };
            if tag == child {
                return Err(TreeError::Cycle { child, container });
            }
            current = self.views.get(&tag).and_then(|view| view.parent);
        }
        Err(TreeError::Cycle { child, container })
    }

    fn view_mut(&mut self, tag: i64) -> Result<&mut ShadowView, TreeError> {
        self.views.get_mut(&tag).ok_or(TreeError::UnknownView(tag))
    }

    /// Create a root view
    pub fn add_root(&mut self, tag: i64, view_name: &str) -> Result<(), TreeError> {
        self.create(tag, view_name, tag, Map::new())?;
        self.roots.insert(tag);
        Ok(())
    }

    /// Create a detached view
    pub fn create(
        &mut self,
        tag: i64,
        view_name: &str,
        root_tag: i64,
        props: Map<String, Value>,
    ) -> Result<(), TreeError> {
        if self.views.contains_key(&tag) {
            return Err(TreeError::DuplicateTag(tag));
        }
        let mut view = ShadowView {
            tag,
            view_name: view_name.to_string(),
            root_tag,
            props: Map::new(),
            children: Vec::new(),
            parent: None,
            frame: Frame::default(),
        };
        apply_props(&mut view.props, props);
        self.views.insert(tag, view);
        Ok(())
    }

    /// Merge props into a view; `null` values remove the prop
    pub fn update(&mut self, tag: i64, props: Map<String, Value>) -> Result<(), TreeError> {
        let view = self.view_mut(tag)?;
        apply_props(&mut view.props, props);
        Ok(())
    }

    /// Set the layout frame of a view
    pub fn set_frame(&mut self, tag: i64, frame: Frame) -> Result<(), TreeError> {
        self.view_mut(tag)?.frame = frame;
        Ok(())
    }

    /// Reorder, insert and remove children of `container`.
    ///
    /// Indices in `move_from` and `remove_at` refer to the children before the
    /// operation. `move_to` and `add_at` refer to the children after it.
    /// Moved views keep their subtree; removed views are destroyed.
    pub fn manage_children(
        &mut self,
        container: i64,
        move_from: &[usize],
        move_to: &[usize],
        add_tags: &[i64],
        add_at: &[usize],
        remove_at: &[usize],
    ) -> Result<(), TreeError> {
        if move_from.len() != move_to.len() {
            return Err(TreeError::Mismatched("move"));
        }
        if add_tags.len() != add_at.len() {
            return Err(TreeError::Mismatched("add"));
        }
        for &tag in add_tags {
            let view = self.views.get(&tag).ok_or(TreeError::UnknownView(tag))?;
            if let Some(parent) = view.parent {
                return Err(TreeError::AlreadyParented { child: tag, parent });
            }
            self.check_acyclic(container, tag)?;
        }

        let children = &self.view_mut(container)?.children;
        let len = children.len();
        if let Some(&index) = move_from.iter().chain(remove_at).find(|&&i| i >= len) {
            return Err(TreeError::IndexOutOfRange { container, index, len });
        }
        let moved: Vec<i64> = move_from.iter().map(|&i| children[i]).collect();
        let removed: Vec<i64> = remove_at.iter().map(|&i| children[i]).collect();

        let mut detach: Vec<usize> = move_from.iter().chain(remove_at).copied().collect();
        detach.sort_unstable();
        detach.dedup();

        let mut insert: Vec<(usize, i64)> = move_to
            .iter()
            .copied()
            .zip(moved.iter().copied())
            .chain(add_at.iter().copied().zip(add_tags.iter().copied()))
            .collect();
        insert.sort_unstable_by_key(|&(index, _)| index);

        let remaining = len - detach.len();
        for (inserted, &(index, _)) in insert.iter().enumerate() {
            if index > remaining + inserted {
                return Err(TreeError::IndexOutOfRange {
                    container,
                    index,
                    len: remaining + inserted,
                });
            }
        }

        let children = &mut self.view_mut(container)?.children;
        for index in detach.into_iter().rev() {
            children.remove(index);
        }
        for &(index, tag) in &insert {
            children.insert(index, tag);
        }

        for &(_, tag) in &insert {
            self.view_mut(tag)?.parent = Some(container);
        }
        for tag in removed {
            if !moved.contains(&tag) {
                self.destroy(tag);
            }
        }
        Ok(())
    }

    /// Replace the children of a view; previous children are detached, not destroyed
    pub fn set_children(&mut self, container: i64, tags: &[i64]) -> Result<(), TreeError> {
        self.view_mut(container)?;
        for &tag in tags {
            let view = self.views.get(&tag).ok_or(TreeError::UnknownView(tag))?;
            if let Some(parent) = view.parent.filter(|&p| p != container) {
                return Err(TreeError::AlreadyParented { child: tag, parent });
            }
            self.check_acyclic(container, tag)?;
        }
        let previous = std::mem::replace(&mut self.view_mut(container)?.children, tags.to_vec());
        for tag in previous {
            if let Some(view) = self.views.get_mut(&tag) {
                view.parent = None;
            }
        }
        for &tag in tags {
            self.view_mut(tag)?.parent = Some(container);
        }
        Ok(())
    }

    /// Destroy every child of `container`, keeping the container itself
    pub fn remove_subviews(&mut self, container: i64) -> Result<(), TreeError> {
        let children = std::mem::take(&mut self.view_mut(container)?.children);
        for child in children {
            self.destroy(child);
        }
        Ok(())
    }

    /// Remove a root view and everything below it
    pub fn remove_root(&mut self, tag: i64) -> Result<(), TreeError> {
        if !self.roots.remove(&tag) {
            return Err(TreeError::UnknownView(tag));
        }
        self.destroy(tag);
        Ok(())
    }

    /// `[x, y, width, height, pageX, pageY]`
    pub fn measure(&self, tag: i64) -> Result<[f64; 6], TreeError> {
        let view = self.views.get(&tag).ok_or(TreeError::UnknownView(tag))?;
        let frame = view.frame;
        let (mut page_x, mut page_y) = (frame.x, frame.y);
        let mut parent = view.parent;
        // A well-formed tree has no path longer than the view count.
        for _ in 0..self.views.len() {
            let Some(tag) = parent else { break };
            let Some(ancestor) = self.views.get(&tag) else { break };
            page_x += ancestor.frame.x;
            page_y += ancestor.frame.y;
            parent = ancestor.parent;
        }
        Ok([frame.x, frame.y, frame.width, frame.height, page_x, page_y])
    }

    /// Remove a view and its subtree
    fn destroy(&mut self, tag: i64) {
        let mut stack = vec![tag];
        while let Some(tag) = stack.pop() {
            if let Some(view) = self.views.remove(&tag) {
                stack.extend(view.children);
            }
        }
    }
}

fn apply_props(target: &mut Map<String, Value>, props: Map<String, Value>) {
    for (name, value) in props {
        if value.is_null() {
            target.remove(&name);
        } else {
            target.insert(name, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hostbridge_sdk::json;

    fn tree_with_children(count: i64) -> ShadowTree {
        let mut tree = ShadowTree::new();
        tree.add_root(1, "RCTView").unwrap();
        let tags: Vec<i64> = (0..count).map(|i| 100 + i).collect();
        for &tag in &tags {
            tree.create(tag, "RCTView", 1, Map::new()).unwrap();
        }
        tree.set_children(1, &tags).unwrap();
        tree
    }

    #[test]
    fn test_manage_children_moves_adds_and_removes() {
        let mut tree = tree_with_children(3);
        tree.create(200, "RCTText", 1, Map::new()).unwrap();

        // [100, 101, 102] -> move 100 to the end, remove 101, add 200 first
        tree.manage_children(1, &[0], &[2], &[200], &[0], &[1]).unwrap();

        assert_eq!(tree.get(1).unwrap().children, vec![200, 102, 100]);
        assert!(tree.get(101).is_none());
        assert_eq!(tree.get(200).unwrap().parent, Some(1));
    }

    #[test]
    fn test_manage_children_rejects_bad_indices() {
        let mut tree = tree_with_children(2);
        assert_eq!(
            tree.manage_children(1, &[], &[], &[], &[], &[5]),
            Err(TreeError::IndexOutOfRange { container: 1, index: 5, len: 2 })
        );
        assert_eq!(
            tree.manage_children(1, &[0], &[], &[], &[], &[]),
            Err(TreeError::Mismatched("move"))
        );
        assert_eq!(tree.get(1).unwrap().children, vec![100, 101]);
    }

    #[test]
    fn test_remove_root_destroys_subtree() {
        let mut tree = tree_with_children(2);
        tree.remove_root(1).unwrap();
        assert!(tree.is_empty());
        assert_eq!(tree.remove_root(1), Err(TreeError::UnknownView(1)));
    }

    #[test]
    fn test_update_merges_and_clears_props() {
        let mut tree = ShadowTree::new();
        let props = json!({ "opacity": 0.5, "testID": "a" });
        tree.create(3, "RCTView", 1, props.as_object().cloned().unwrap()).unwrap();
        let update = json!({ "testID": null, "backgroundColor": 255 });
        tree.update(3, update.as_object().cloned().unwrap()).unwrap();

        let view = tree.get(3).unwrap();
        assert_eq!(view.props.get("testID"), None);
        assert_eq!(view.props["opacity"], json!(0.5));
        assert_eq!(view.props["backgroundColor"], json!(255));
    }

    #[test]
    fn test_view_cannot_become_its_own_ancestor() {
        let mut tree = tree_with_children(1);
        tree.create(2, "RCTView", 1, Map::new()).unwrap();

        assert_eq!(tree.set_children(2, &[2]), Err(TreeError::Cycle { child: 2, container: 2 }));
        assert_eq!(tree.get(2).unwrap().parent, None);

        // 100 sits below root 1, so the root cannot move under 100.
        assert_eq!(
            tree.manage_children(100, &[], &[], &[1], &[0], &[]),
            Err(TreeError::Cycle { child: 1, container: 100 })
        );
        assert!(tree.get(100).unwrap().children.is_empty());
        assert_eq!(tree.measure(100).unwrap()[4], 0.0);
    }

    #[test]
    fn test_measure_accumulates_page_offset() {
        let mut tree = tree_with_children(1);
        tree.set_frame(1, Frame::new(10.0, 20.0, 300.0, 400.0)).unwrap();
        tree.set_frame(100, Frame::new(5.0, 6.0, 50.0, 60.0)).unwrap();
        assert_eq!(tree.measure(100).unwrap(), [5.0, 6.0, 50.0, 60.0, 15.0, 26.0]);
    }
}
