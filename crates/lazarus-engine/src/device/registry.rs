use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use super::{DeviceError, GpuBackend};

/// Capability set every GPU-resource-owning object implements.
///
/// Callbacks run on the owning thread, in registration order, with the
/// resource mutably borrowed. CPU-side configuration must survive
/// `on_device_lost` so that `on_device_reset` can rebuild from it.
pub trait DeviceResource {
    /// Release GPU handles; keep CPU configuration.
    fn on_device_lost(&mut self, gpu: &mut dyn GpuBackend) -> Result<(), DeviceError>;

    /// Recreate GPU handles from the preserved configuration.
    fn on_device_reset(&mut self, gpu: &mut dyn GpuBackend) -> Result<(), DeviceError>;

    /// Release everything without expecting a reset.
    fn force_release(&mut self, gpu: &mut dyn GpuBackend) -> Result<(), DeviceError>;

    /// True for resources that present into their own window (extra swap chains).
    fn presents_to_window(&self) -> bool {
        false
    }
}

/// Registration-order identity of a registered resource.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct ResourceId(u64);

impl ResourceId {
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

type ResourceRef = Weak<RefCell<dyn DeviceResource>>;

#[derive(Default)]
struct RegistryInner {
    entries: Vec<(ResourceId, ResourceRef)>,
    /// Resources that were borrowed when the loss was announced.
    pending_lost: Vec<ResourceId>,
    next_id: u64,
}

impl RegistryInner {
    fn remove(&mut self, id: ResourceId) {
        self.entries.retain(|(eid, _)| *eid != id);
        self.pending_lost.retain(|pid| *pid != id);
    }
}

/// Ordered list of every live device resource of one device context.
///
/// Cloning yields another handle to the same list.
#[derive(Clone, Default)]
pub struct DeviceRegistry {
    inner: Rc<RefCell<RegistryInner>>,
}

/// RAII registration; dropping it removes the entry from the registry.
pub struct Registration {
    id: ResourceId,
    registry: Weak<RefCell<RegistryInner>>,
}

impl Registration {
    pub fn id(&self) -> ResourceId {
        self.id
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration").field("id", &self.id).finish()
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        let Some(inner) = self.registry.upgrade() else { return };
        match inner.try_borrow_mut() {
            Ok(mut inner) => inner.remove(self.id),
            // Only reachable if a drop happens inside another registry borrow;
            // the dead weak entry is pruned on the next pass instead.
            Err(_) => log::debug!("deferred unregister of device resource {}", self.id),
        }
    }
}

#[derive(Debug, Copy, Clone)]
enum Notification {
    Lost,
    Reset,
    ForceRelease,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `resource`; it will be notified after everything registered before it.
    pub fn register(&self, resource: &Rc<RefCell<dyn DeviceResource>>) -> Registration {
        let mut inner = self.inner.borrow_mut();
        inner.next_id += 1;
        let id = ResourceId(inner.next_id);
        inner.entries.push((id, Rc::downgrade(resource)));
        Registration {
            id,
            registry: Rc::downgrade(&self.inner),
        }
    }

    /// Removes an entry ahead of its `Registration` being dropped.
    pub fn unregister(&self, id: ResourceId) -> bool {
        let mut inner = self.inner.borrow_mut();
        let before = inner.entries.len();
        inner.remove(id);
        inner.entries.len() != before
    }

    /// Number of live registered resources.
    pub fn len(&self) -> usize {
        self.inner
            .borrow()
            .entries
            .iter()
            .filter(|(_, r)| r.strong_count() > 0)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Live resources that present into their own window.
    pub fn count_render_windows(&self) -> usize {
        self.snapshot()
            .into_iter()
            .filter_map(|(_, r)| r.upgrade())
            .filter(|r| r.try_borrow().map(|r| r.presents_to_window()).unwrap_or(false))
            .count()
    }

    /// Resources still waiting for a lost notification they were too busy to take.
    pub fn pending_lost(&self) -> usize {
        self.inner.borrow().pending_lost.len()
    }

    /// Announces the loss. Resources that are borrowed at this point report
    /// `ResourceBusy` and are remembered for `retry_lost`.
    pub fn notify_lost(&self, gpu: &mut dyn GpuBackend) -> Result<(), DeviceError> {
        self.notify(Notification::Lost, gpu, |_| true)
    }

    /// Delivers the lost notification to resources that missed it.
    ///
    /// Must run before the device is reset, while their old handles are
    /// still valid.
    pub fn retry_lost(&self, gpu: &mut dyn GpuBackend) -> Result<(), DeviceError> {
        let pending = self.inner.borrow().pending_lost.clone();
        if pending.is_empty() {
            return Ok(());
        }
        log::debug!("retrying lost notification for {} resource(s)", pending.len());
        self.notify(Notification::Lost, gpu, |id| pending.contains(&id))
    }

    pub fn notify_reset(&self, gpu: &mut dyn GpuBackend) -> Result<(), DeviceError> {
        self.notify(Notification::Reset, gpu, |_| true)
    }

    pub fn notify_force_release(&self, gpu: &mut dyn GpuBackend) -> Result<(), DeviceError> {
        self.notify(Notification::ForceRelease, gpu, |_| true)
    }

    fn snapshot(&self) -> Vec<(ResourceId, ResourceRef)> {
        self.inner.borrow().entries.clone()
    }

    /// Delivers one notification to every live resource selected by `only`,
    /// then returns the first failure, if any. Iterates a snapshot so
    /// callbacks may (un)register.
    fn notify(
        &self,
        what: Notification,
        gpu: &mut dyn GpuBackend,
        only: impl Fn(ResourceId) -> bool,
    ) -> Result<(), DeviceError> {
        let mut errors = Vec::new();
        let mut saw_dead = false;

        for (id, weak) in self.snapshot() {
            if !only(id) {
                continue;
            }
            let Some(resource) = weak.upgrade() else {
                saw_dead = true;
                continue;
            };

            // Skip resources unregistered by an earlier callback in this pass.
            if !self.contains(id) {
                continue;
            }

            let outcome = match resource.try_borrow_mut() {
                Ok(mut r) => match what {
                    Notification::Lost => r.on_device_lost(gpu),
                    Notification::Reset => r.on_device_reset(gpu),
                    Notification::ForceRelease => r.force_release(gpu),
                },
                Err(_) => Err(DeviceError::ResourceBusy(id.raw())),
            };

            match (&outcome, what) {
                (Err(DeviceError::ResourceBusy(_)), Notification::Lost) => {
                    self.set_pending_lost(id, true)
                }
                (_, Notification::Lost | Notification::ForceRelease) => {
                    self.set_pending_lost(id, false)
                }
                (_, Notification::Reset) => {}
            }

            if let Err(e) = outcome {
                log::warn!("device resource {id} failed {what:?} notification: {e}");
                errors.push(e);
            }
        }

        if saw_dead {
            self.prune();
        }

        match errors.into_iter().next() {
            Some(first) => Err(first),
            None => Ok(()),
        }
    }

    fn contains(&self, id: ResourceId) -> bool {
        self.inner.borrow().entries.iter().any(|(eid, _)| *eid == id)
    }

    fn set_pending_lost(&self, id: ResourceId, pending: bool) {
        let mut inner = self.inner.borrow_mut();
        let listed = inner.pending_lost.contains(&id);
        if pending && !listed {
            inner.pending_lost.push(id);
        } else if !pending && listed {
            inner.pending_lost.retain(|pid| *pid != id);
        }
    }

    fn prune(&self) {
        if let Ok(mut inner) = self.inner.try_borrow_mut() {
            inner.entries.retain(|(_, r)| r.strong_count() > 0);
            let RegistryInner {
                entries,
                pending_lost,
                ..
            } = &mut *inner;
            pending_lost.retain(|id| entries.iter().any(|(eid, _)| eid == id));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::recording::RecordingBackend;
    use crate::device::{ResultCode, ResultKind};
    use pretty_assertions::assert_eq;

    type Log = Rc<RefCell<Vec<String>>>;

    struct Watcher {
        name: &'static str,
        log: Log,
        fail_on_lost: bool,
        fail_on_reset: bool,
        fail_on_release: bool,
        registration: Option<Registration>,
        drop_own_registration: bool,
    }

    impl Watcher {
        fn new(name: &'static str, log: &Log) -> Self {
            Self {
                name,
                log: log.clone(),
                fail_on_lost: false,
                fail_on_reset: false,
                fail_on_release: false,
                registration: None,
                drop_own_registration: false,
            }
        }
    }

    impl DeviceResource for Watcher {
        fn on_device_lost(&mut self, _gpu: &mut dyn GpuBackend) -> Result<(), DeviceError> {
            self.log.borrow_mut().push(format!("lost:{}", self.name));
            if self.drop_own_registration {
                self.registration = None;
            }
            if self.fail_on_lost {
                return Err(ResultCode::new(ResultKind::InvalidCall, self.name).into());
            }
            Ok(())
        }

        fn on_device_reset(&mut self, _gpu: &mut dyn GpuBackend) -> Result<(), DeviceError> {
            self.log.borrow_mut().push(format!("reset:{}", self.name));
            if self.fail_on_reset {
                return Err(ResultCode::new(ResultKind::OutOfVideoMemory, self.name).into());
            }
            Ok(())
        }

        fn force_release(&mut self, _gpu: &mut dyn GpuBackend) -> Result<(), DeviceError> {
            self.log.borrow_mut().push(format!("release:{}", self.name));
            if self.fail_on_release {
                return Err(ResultCode::new(ResultKind::InvalidCall, self.name).into());
            }
            Ok(())
        }
    }

    fn register(registry: &DeviceRegistry, watcher: Watcher) -> Rc<RefCell<Watcher>> {
        let rc = Rc::new(RefCell::new(watcher));
        let dyn_rc: Rc<RefCell<dyn DeviceResource>> = rc.clone();
        let reg = registry.register(&dyn_rc);
        rc.borrow_mut().registration = Some(reg);
        rc
    }

    #[test]
    fn notifications_follow_registration_order() {
        let registry = DeviceRegistry::new();
        let log = Log::default();
        let (mut gpu, _rec) = RecordingBackend::new();

        let _a = register(&registry, Watcher::new("a", &log));
        let _b = register(&registry, Watcher::new("b", &log));
        let _c = register(&registry, Watcher::new("c", &log));

        registry.notify_lost(&mut gpu).unwrap();
        registry.notify_reset(&mut gpu).unwrap();

        assert_eq!(
            *log.borrow(),
            vec!["lost:a", "lost:b", "lost:c", "reset:a", "reset:b", "reset:c"]
        );
    }

    #[test]
    fn failure_does_not_stop_the_pass_and_first_error_wins() {
        let registry = DeviceRegistry::new();
        let log = Log::default();
        let (mut gpu, _rec) = RecordingBackend::new();

        let mut a = Watcher::new("a", &log);
        a.fail_on_lost = true;
        let mut b = Watcher::new("b", &log);
        b.fail_on_lost = true;
        let _a = register(&registry, a);
        let _b = register(&registry, b);
        let _c = register(&registry, Watcher::new("c", &log));

        let err = registry.notify_lost(&mut gpu).unwrap_err();
        match err {
            DeviceError::Driver(rc) => assert_eq!(rc.description, "a"),
            other => panic!("unexpected error {other:?}"),
        }
        assert_eq!(*log.borrow(), vec!["lost:a", "lost:b", "lost:c"]);
    }

    #[test]
    fn self_unregistering_resource_does_not_disturb_iteration() {
        let registry = DeviceRegistry::new();
        let log = Log::default();
        let (mut gpu, _rec) = RecordingBackend::new();

        let _a = register(&registry, Watcher::new("a", &log));
        let mut b = Watcher::new("b", &log);
        b.drop_own_registration = true;
        let _b = register(&registry, b);
        let _c = register(&registry, Watcher::new("c", &log));

        registry.notify_lost(&mut gpu).unwrap();
        assert_eq!(registry.len(), 2);

        registry.notify_reset(&mut gpu).unwrap();
        assert_eq!(
            *log.borrow(),
            vec!["lost:a", "lost:b", "lost:c", "reset:a", "reset:c"]
        );
    }

    #[test]
    fn dropped_resources_are_unregistered() {
        let registry = DeviceRegistry::new();
        let log = Log::default();
        let (mut gpu, _rec) = RecordingBackend::new();

        let a = register(&registry, Watcher::new("a", &log));
        let _b = register(&registry, Watcher::new("b", &log));
        drop(a);

        assert_eq!(registry.len(), 1);
        registry.notify_force_release(&mut gpu).unwrap();
        assert_eq!(*log.borrow(), vec!["release:b"]);
    }

    #[test]
    fn borrowed_resource_reports_busy_but_others_still_run() {
        let registry = DeviceRegistry::new();
        let log = Log::default();
        let (mut gpu, _rec) = RecordingBackend::new();

        let a = register(&registry, Watcher::new("a", &log));
        let _b = register(&registry, Watcher::new("b", &log));

        let guard = a.borrow();
        let err = registry.notify_lost(&mut gpu).unwrap_err();
        drop(guard);

        assert!(matches!(err, DeviceError::ResourceBusy(_)));
        assert_eq!(*log.borrow(), vec!["lost:b"]);
    }

    #[test]
    fn reset_failures_are_reported_after_the_whole_pass() {
        let registry = DeviceRegistry::new();
        let log = Log::default();
        let (mut gpu, _rec) = RecordingBackend::new();

        let _a = register(&registry, Watcher::new("a", &log));
        let mut b = Watcher::new("b", &log);
        b.fail_on_reset = true;
        let mut c = Watcher::new("c", &log);
        c.fail_on_reset = true;
        let _b = register(&registry, b);
        let _c = register(&registry, c);

        let err = registry.notify_reset(&mut gpu).unwrap_err();
        match err {
            DeviceError::Driver(rc) => {
                assert_eq!(rc.kind, ResultKind::OutOfVideoMemory);
                assert_eq!(rc.description, "b");
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert_eq!(*log.borrow(), vec!["reset:a", "reset:b", "reset:c"]);
    }

    #[test]
    fn force_release_reaches_resources_after_a_failure() {
        let registry = DeviceRegistry::new();
        let log = Log::default();
        let (mut gpu, _rec) = RecordingBackend::new();

        let mut a = Watcher::new("a", &log);
        a.fail_on_release = true;
        let _a = register(&registry, a);
        let _b = register(&registry, Watcher::new("b", &log));

        let err = registry.notify_force_release(&mut gpu).unwrap_err();
        assert!(matches!(err, DeviceError::Driver(ref rc) if rc.description == "a"));
        assert_eq!(*log.borrow(), vec!["release:a", "release:b"]);
    }

    #[test]
    fn busy_resource_gets_the_lost_notification_on_retry() {
        let registry = DeviceRegistry::new();
        let log = Log::default();
        let (mut gpu, _rec) = RecordingBackend::new();

        let a = register(&registry, Watcher::new("a", &log));
        let _b = register(&registry, Watcher::new("b", &log));

        let guard = a.borrow();
        assert!(registry.notify_lost(&mut gpu).is_err());
        assert_eq!(registry.pending_lost(), 1);

        // Still borrowed: stays pending.
        assert!(matches!(
            registry.retry_lost(&mut gpu),
            Err(DeviceError::ResourceBusy(_))
        ));
        drop(guard);

        registry.retry_lost(&mut gpu).unwrap();
        registry.retry_lost(&mut gpu).unwrap();
        assert_eq!(registry.pending_lost(), 0);
        assert_eq!(*log.borrow(), vec!["lost:b", "lost:a"]);
    }

    #[test]
    fn dropping_a_pending_resource_forgets_it() {
        let registry = DeviceRegistry::new();
        let log = Log::default();
        let (mut gpu, _rec) = RecordingBackend::new();

        let a = register(&registry, Watcher::new("a", &log));
        {
            let _guard = a.borrow();
            assert!(registry.notify_lost(&mut gpu).is_err());
        }
        drop(a);

        assert_eq!(registry.pending_lost(), 0);
        registry.retry_lost(&mut gpu).unwrap();
        assert!(log.borrow().is_empty());
    }
}
