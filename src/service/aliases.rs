use crate::{
    budget::{
        hashmap_filter_storage::HashMapFilterStorage,
        pure_dp_filter::{PureDPBudget, PureDPBudgetFilter},
        quotas::{FilterId, StaticCapacities},
    },
    events::btreemap_event_storage::BTreeMapEventStorage,
    service::{authority::LocalAuthority, engine::ReportEngine},
};

// Concrete in-memory stack, for embedders without custom storage.

pub type DefaultCapacities = StaticCapacities<FilterId, PureDPBudget>;

pub type DefaultFilterStorage =
    HashMapFilterStorage<PureDPBudgetFilter, DefaultCapacities>;

pub type DefaultEventStorage = BTreeMapEventStorage;

pub type DefaultReportEngine =
    ReportEngine<DefaultEventStorage, DefaultFilterStorage>;

pub type DefaultLocalAuthority =
    LocalAuthority<DefaultEventStorage, DefaultFilterStorage>;
