use std::sync::Arc;

use qualia_hierarchy::{HierarchyBuilder, HierarchyId, HierarchySet, Qualifier, QualifierHierarchy};
use qualia_types::{ClassId, TypeId, TypeStore, TypeVarId};

pub struct Fixture {
    pub store: TypeStore,
    pub hierarchy: Arc<QualifierHierarchy>,
    pub set: HierarchySet,
    pub object: TypeId,
    pub string: TypeId,
    pub list: ClassId,
    pub list_param: TypeVarId,
}

impl Fixture {
    pub fn new() -> Self {
        let mut store = TypeStore::with_object();
        let object_class = store.object_class().unwrap();
        let object = store.declared(object_class, vec![]);
        let string_class = store.add_class("java.lang.String", vec![]);
        let string = store.declared(string_class, vec![]);
        let list_param = store.add_type_param("E");
        let list = store.add_class("java.util.List", vec![list_param]);

        let hierarchy = Arc::new(
            HierarchyBuilder::new(HierarchyId::new(0), "test")
                .chain(["BOTTOM", "MID", "TOP"])
                .build()
                .unwrap(),
        );
        let set = HierarchySet::new([hierarchy.clone()]).unwrap();
        Fixture {
            store,
            hierarchy,
            set,
            object,
            string,
            list,
            list_param,
        }
    }

    pub fn q(&self, name: &str) -> Qualifier {
        self.hierarchy.qualifier(name).unwrap()
    }

    pub fn list_of(&mut self, arg: TypeId) -> TypeId {
        self.store.declared(self.list, vec![arg])
    }
}
