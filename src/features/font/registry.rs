use std::sync::{Arc, PoisonError, RwLock};

use resvg::usvg::fontdb;

/// 进程内字体注册表。
///
/// 渲染时只持有不可变快照（`Arc<Database>`），注册新字体时写时复制，
/// 因此渲染线程与注册流程之间不存在长时间的锁竞争。
/// 字形数据保存在内存中，渲染不依赖临时文件是否仍在磁盘上。
#[derive(Debug, Default)]
pub struct FontRegistry {
    db: RwLock<Arc<fontdb::Database>>,
}

impl FontRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 解析 `data` 中的全部字体并以 `family` 为家族名注册。
    ///
    /// 同名家族已有的字形会先被移除，重新注册等价于替换。
    /// 返回注册的字形数量；数据无法解析为字体时返回 0（不会修改注册表）。
    pub fn register_bytes(&self, data: Vec<u8>, family: &str) -> usize {
        let mut scratch = fontdb::Database::new();
        scratch.load_font_data(data);

        let faces: Vec<fontdb::FaceInfo> = scratch
            .faces()
            .cloned()
            .map(|mut face| {
                face.families = vec![(family.to_string(), fontdb::Language::English_UnitedStates)];
                face
            })
            .collect();
        if faces.is_empty() {
            return 0;
        }

        let count = faces.len();
        let mut guard = self.db.write().unwrap_or_else(PoisonError::into_inner);
        let db = Arc::make_mut(&mut guard);
        let stale: Vec<fontdb::ID> = db
            .faces()
            .filter(|face| face_has_family(face, family))
            .map(|face| face.id)
            .collect();
        if !stale.is_empty() {
            tracing::debug!("替换家族 {} 的 {} 个旧字形", family, stale.len());
        }
        for id in stale {
            db.remove_face(id);
        }
        for face in faces {
            db.push_face_info(face);
        }
        count
    }

    /// 当前注册表快照
    pub fn snapshot(&self) -> Arc<fontdb::Database> {
        self.db
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

fn face_has_family(face: &fontdb::FaceInfo, family: &str) -> bool {
    face.families.iter().any(|(name, _)| name == family)
}


#[cfg(test)]
mod tests {
    use super::test_support::FIXTURE_FONT;
    use super::*;

    fn family_face_count(registry: &FontRegistry, family: &str) -> usize {
        registry
            .snapshot()
            .faces()
            .filter(|face| face_has_family(face, family))
            .count()
    }

    fn contains_family(registry: &FontRegistry, family: &str) -> bool {
        family_face_count(registry, family) > 0
    }

    #[test]
    fn garbage_bytes_register_nothing() {
        let registry = FontRegistry::new();
        let n = registry.register_bytes(b"definitely not a font".to_vec(), "cover-font-broken");
        assert_eq!(n, 0);
        assert!(registry.snapshot().is_empty());
        assert!(!contains_family(&registry, "cover-font-broken"));
    }

    #[test]
    fn registered_faces_use_given_family_and_old_snapshots_stay_intact() {
        let registry = FontRegistry::new();
        let before = registry.snapshot();

        let n = registry.register_bytes(FIXTURE_FONT.to_vec(), "cover-font-test");
        assert!(n >= 1);
        assert!(contains_family(&registry, "cover-font-test"));
        assert!(!contains_family(&registry, "Tuffy"));
        assert!(before.is_empty(), "old snapshot must not change");

        registry.register_bytes(FIXTURE_FONT.to_vec(), "cover-font-other");
        assert!(contains_family(&registry, "cover-font-test"));
        assert!(contains_family(&registry, "cover-font-other"));
    }

    #[test]
    fn registered_faces_are_held_in_memory() {
        let registry = FontRegistry::new();
        registry.register_bytes(FIXTURE_FONT.to_vec(), "cover-font-mem");
        let db = registry.snapshot();
        assert!(
            db.faces()
                .all(|face| matches!(face.source, fontdb::Source::Binary(_)))
        );
    }

    #[test]
    fn re_registering_a_family_replaces_its_faces() {
        let registry = FontRegistry::new();
        let first = registry.register_bytes(FIXTURE_FONT.to_vec(), "cover-font-again");
        let kept = registry.register_bytes(FIXTURE_FONT.to_vec(), "cover-font-kept");
        let stale_snapshot = registry.snapshot();

        let second = registry.register_bytes(FIXTURE_FONT.to_vec(), "cover-font-again");
        assert_eq!(first, second);
        assert_eq!(family_face_count(&registry, "cover-font-again"), second);
        assert_eq!(family_face_count(&registry, "cover-font-kept"), kept);
        assert_eq!(registry.snapshot().len(), second + kept);
        assert_eq!(stale_snapshot.len(), first + kept, "old snapshot must not change");
    }
}
