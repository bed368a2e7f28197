//! Behaviors: leaf components attached to one actor

use crate::error::LifecycleError;
use crate::lifecycle::Lifecycle;
use crate::node::{ComponentKey, Node};
use crate::scene::Scene;

impl Scene {
    /// Create an unattached behavior driven by `script`
    pub fn create_behavior<T: Lifecycle>(&mut self, script: T) -> ComponentKey {
        self.nodes.insert(Node::behavior(script))
    }

    /// Create a behavior and add it to `actor`
    pub fn attach<T: Lifecycle>(&mut self, actor: ComponentKey, script: T) -> Result<ComponentKey, LifecycleError> {
        let behavior = self.create_behavior(script);
        self.add_component(actor, behavior)?;
        Ok(behavior)
    }

    /// The actor a behavior (or actor) is attached to
    #[inline]
    pub fn owner(&self, key: ComponentKey) -> Option<ComponentKey> {
        self.parent(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HookResult;
    use crate::lifecycle::HookContext;
    use crate::node::ComponentKind;

    #[derive(Default)]
    struct Follow {
        seen_owner: Option<ComponentKey>,
    }

    impl Lifecycle for Follow {
        fn on_create(&mut self, cx: &mut HookContext<'_>) -> HookResult {
            self.seen_owner = cx.owner();
            Ok(())
        }
    }

    #[test]
    fn test_attach_creates_under_created_actor() {
        let mut scene = Scene::new("behaviors");
        pollster::block_on(scene.load(async { Ok(()) })).unwrap();
        scene.create().unwrap();
        let root = scene.root();

        let follow = scene.attach(root, Follow::default()).unwrap();
        assert_eq!(scene.kind(follow), Some(ComponentKind::Behavior));
        assert_eq!(scene.owner(follow), Some(root));
        assert!(scene.is_created(follow));
        assert_eq!(scene.script::<Follow>(follow).unwrap().seen_owner, Some(root));
    }

    #[test]
    fn test_behavior_cannot_parent() {
        let mut scene = Scene::new("behaviors");
        let follow = scene.create_behavior(Follow::default());
        let other = scene.create_behavior(Follow::default());
        scene.add_component(follow, other).unwrap();
        assert_eq!(scene.owner(other), None);
        assert!(scene.children(follow).is_none());
    }
}
