use super::{AttributesKind, FileAttributes};
use crate::file::{FileId, MfVirtualFile};
use formainframe_core::{Error, Result};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// Observer of attribute changes.
pub trait AttributesListener: Send + Sync {
    /// A handle was created for newly discovered attributes.
    fn on_create(&self, _attributes: &FileAttributes, _file: &MfVirtualFile) {}

    /// Attributes of an existing handle changed.
    fn on_update(
        &self,
        _old: &FileAttributes,
        _new: &FileAttributes,
        _file: &MfVirtualFile,
    ) {
    }

    /// Attributes were removed and the handle forgotten.
    fn on_delete(&self, _attributes: &FileAttributes, _file: &MfVirtualFile) {}
}

/// Two-way map between handles and the attributes of one resource kind.
pub trait AttributesService: Send + Sync {
    /// Kind of attributes held.
    fn kind(&self) -> AttributesKind;

    /// Attributes of `file`.
    fn get_attributes(&self, file: &MfVirtualFile) -> Option<FileAttributes>;

    /// Handle of the resource `attributes` describe.
    fn get_virtual_file(&self, attributes: &FileAttributes) -> Option<MfVirtualFile>;

    /// Handle of the resource, created on first sight.
    ///
    /// When the resource is already known, the stored attributes are
    /// replaced by `attributes` and the requesters of both are merged.
    ///
    /// # Errors
    ///
    /// Fails when `attributes` is of another kind.
    fn get_or_create_virtual_file(&self, attributes: FileAttributes) -> Result<MfVirtualFile>;

    /// Replace the attributes of a known handle.
    ///
    /// # Errors
    ///
    /// Fails when the handle is unknown or `attributes` is of another kind.
    fn update_attributes(&self, file: &MfVirtualFile, attributes: FileAttributes) -> Result<()>;

    /// Forget `file` and its attributes.
    fn clear_attributes(&self, file: &MfVirtualFile);

    /// Register an observer.
    fn add_listener(&self, listener: Arc<dyn AttributesListener>);
}

#[derive(Debug, Default)]
struct Registry {
    by_file: HashMap<FileId, (MfVirtualFile, FileAttributes)>,
    by_identity: HashMap<String, FileId>,
}

/// In-memory [`AttributesService`] for one [`AttributesKind`].
pub struct RemoteAttributesService {
    kind: AttributesKind,
    registry: RwLock<Registry>,
    listeners: RwLock<Vec<Arc<dyn AttributesListener>>>,
}

impl std::fmt::Debug for RemoteAttributesService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteAttributesService")
            .field("kind", &self.kind)
            .field("files", &self.len())
            .finish_non_exhaustive()
    }
}

impl RemoteAttributesService {
    /// Empty service for `kind`.
    #[must_use]
    pub fn new(kind: AttributesKind) -> Self {
        Self {
            kind,
            registry: RwLock::new(Registry::default()),
            listeners: RwLock::new(Vec::new()),
        }
    }

    /// Number of known handles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.registry
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .by_file
            .len()
    }

    /// Whether no handle is known.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn ensure_kind(&self, attributes: &FileAttributes) -> Result<()> {
        if attributes.kind() == self.kind {
            Ok(())
        } else {
            Err(Error::validation(format!(
                "{} attributes cannot be stored by the {} service",
                attributes.kind(),
                self.kind
            )))
        }
    }

    fn listeners(&self) -> Vec<Arc<dyn AttributesListener>> {
        self.listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl AttributesService for RemoteAttributesService {
    fn kind(&self) -> AttributesKind {
        self.kind
    }

    fn get_attributes(&self, file: &MfVirtualFile) -> Option<FileAttributes> {
        self.registry
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .by_file
            .get(&file.id())
            .map(|(_, attributes)| attributes.clone())
    }

    fn get_virtual_file(&self, attributes: &FileAttributes) -> Option<MfVirtualFile> {
        let registry = self.registry.read().unwrap_or_else(PoisonError::into_inner);
        let id = registry.by_identity.get(&attributes.identity())?;
        registry.by_file.get(id).map(|(file, _)| file.clone())
    }

    fn get_or_create_virtual_file(&self, mut attributes: FileAttributes) -> Result<MfVirtualFile> {
        self.ensure_kind(&attributes)?;
        let identity = attributes.identity();
        let (file, previous) = {
            let mut registry = self.registry.write().unwrap_or_else(PoisonError::into_inner);
            let existing = registry
                .by_identity
                .get(&identity)
                .and_then(|id| registry.by_file.get(id))
                .map(|(file, previous)| (file.clone(), previous.clone()));
            if let Some((file, previous)) = existing {
                attributes.merge_requesters(&previous);
                registry
                    .by_file
                    .insert(file.id(), (file.clone(), attributes.clone()));
                (file, Some(previous))
            } else {
                let file = MfVirtualFile::new(
                    attributes.name(),
                    attributes.file_path(),
                    attributes.is_directory(),
                );
                registry.by_identity.insert(identity, file.id());
                registry
                    .by_file
                    .insert(file.id(), (file.clone(), attributes.clone()));
                (file, None)
            }
        };

        for listener in self.listeners() {
            match &previous {
                Some(old) => listener.on_update(old, &attributes, &file),
                None => listener.on_create(&attributes, &file),
            }
        }
        Ok(file)
    }

    fn update_attributes(&self, file: &MfVirtualFile, attributes: FileAttributes) -> Result<()> {
        self.ensure_kind(&attributes)?;
        let old = {
            let mut registry = self.registry.write().unwrap_or_else(PoisonError::into_inner);
            let Some((_, stored)) = registry.by_file.get_mut(&file.id()) else {
                return Err(Error::not_found(format!("attributes of {file}")));
            };
            let old = std::mem::replace(stored, attributes.clone());
            let old_identity = old.identity();
            let new_identity = attributes.identity();
            if old_identity != new_identity {
                registry.by_identity.remove(&old_identity);
                registry.by_identity.insert(new_identity, file.id());
            }
            old
        };
        for listener in self.listeners() {
            listener.on_update(&old, &attributes, file);
        }
        Ok(())
    }

    fn clear_attributes(&self, file: &MfVirtualFile) {
        let removed = {
            let mut registry = self.registry.write().unwrap_or_else(PoisonError::into_inner);
            let removed = registry.by_file.remove(&file.id());
            if let Some((_, attributes)) = &removed {
                registry.by_identity.remove(&attributes.identity());
            }
            removed
        };
        if let Some((file, attributes)) = removed {
            tracing::debug!(file = %file, "Attributes cleared");
            for listener in self.listeners() {
                listener.on_delete(&attributes, &file);
            }
        }
    }

    fn add_listener(&self, listener: Arc<dyn AttributesListener>) {
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(listener);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::model::UssFileInfo;
    use crate::attributes::{Requester, UssAttributes};
    use formainframe_core::ConnectionConfig;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<&'static str>>,
    }

    impl AttributesListener for Recorder {
        fn on_create(&self, _: &FileAttributes, _: &MfVirtualFile) {
            self.calls.lock().unwrap().push("create");
        }
        fn on_update(&self, _: &FileAttributes, _: &FileAttributes, _: &MfVirtualFile) {
            self.calls.lock().unwrap().push("update");
        }
        fn on_delete(&self, _: &FileAttributes, _: &MfVirtualFile) {
            self.calls.lock().unwrap().push("delete");
        }
    }

    fn uss(path: &str, connection: &ConnectionConfig) -> FileAttributes {
        let info = UssFileInfo::default();
        FileAttributes::Uss(UssAttributes {
            path: path.into(),
            is_directory: info.is_directory(),
            length: info.size,
            url: connection.url.clone(),
            requesters: vec![Requester::Uss {
                connection: connection.clone(),
            }],
            charset: None,
        })
    }

    #[test]
    fn test_rediscovery_merges_requesters() {
        let service = RemoteAttributesService::new(AttributesKind::Uss);
        let recorder = Arc::new(Recorder::default());
        service.add_listener(recorder.clone());
        let a = ConnectionConfig::new("a", "https://h");
        let b = ConnectionConfig::new("b", "https://h");

        let first = service
            .get_or_create_virtual_file(uss("/u/x", &a))
            .unwrap();
        let second = service
            .get_or_create_virtual_file(uss("/u/x", &b))
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(service.len(), 1);
        let attributes = service.get_attributes(&first).unwrap();
        assert_eq!(attributes.requesters().len(), 2);
        assert_eq!(attributes.requesters()[0].connection(), &a);

        service.clear_attributes(&first);
        assert!(service.get_attributes(&first).is_none());
        assert!(service.get_virtual_file(&attributes).is_none());
        assert_eq!(
            *recorder.calls.lock().unwrap(),
            vec!["create", "update", "delete"]
        );
    }

    #[test]
    fn test_wrong_kind_rejected() {
        let service = RemoteAttributesService::new(AttributesKind::Dataset);
        let conn = ConnectionConfig::new("a", "https://h");
        assert!(service.get_or_create_virtual_file(uss("/u", &conn)).is_err());
        assert!(service.is_empty());
    }

    #[test]
    fn test_update_unknown_file() {
        let service = RemoteAttributesService::new(AttributesKind::Uss);
        let conn = ConnectionConfig::new("a", "https://h");
        let stray = MfVirtualFile::new("x", "/x", false);
        assert!(matches!(
            service.update_attributes(&stray, uss("/x", &conn)),
            Err(Error::NotFound { .. })
        ));
    }
}
