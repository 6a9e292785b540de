mod probe;

use mvu_store::{Filtering, Scope, Store, StoreBuilder, TestExecutor, TestSpawner};
pub(crate) use counter::*;
pub(crate) use probe::*;

mod handler_policy_tests;

pub(crate) type CounterStore = Store<CounterUpdate, CounterUiEvent>;
pub(crate) type ProbeStore = Store<ProbeUpdate, ProbeEvent>;

pub(crate) struct CounterTest {
    pub(crate) executor: TestExecutor,
    pub(crate) scope: Scope<TestSpawner>,
    pub(crate) store: CounterStore,
}

/// Built with the load-increment handler, not yet launched.
pub(crate) fn given_a_counter_store() -> CounterTest {
    let executor = TestExecutor::new();
    let scope = executor.scope();
    let store = CounterStore::builder(CounterState::default(), CounterUpdate)
        .name("counter")
        .handler(Filtering::new(LoadIncrementHandler))
        .build();

    CounterTest {
        executor,
        scope,
        store,
    }
}

pub(crate) fn given_a_launched_counter_store() -> CounterTest {
    let test = given_a_counter_store();
    test.store
        .launch(&test.scope)
        .expect("first launch should succeed");
    test
}

pub(crate) struct ProbeTest {
    pub(crate) executor: TestExecutor,
    pub(crate) scope: Scope<TestSpawner>,
    pub(crate) store: ProbeStore,
    pub(crate) gates: Gates,
}

/// A launched probe store with whatever handlers `configure` registers.
pub(crate) fn given_a_probe_store(
    configure: impl FnOnce(
        StoreBuilder<ProbeUpdate, ProbeEvent>,
        &Gates,
    ) -> StoreBuilder<ProbeUpdate, ProbeEvent>,
) -> ProbeTest {
    let executor = TestExecutor::new();
    let scope = executor.scope();
    let gates = Gates::default();
    let builder = ProbeStore::builder(ProbeState::default(), ProbeUpdate).name("probe");
    let store = configure(builder, &gates).build();
    store.launch(&scope).expect("first launch should succeed");

    ProbeTest {
        executor,
        scope,
        store,
        gates,
    }
}
