use std::sync::{Arc, Weak};

use async_trait::async_trait;
use once_cell::sync::OnceCell;
use parking_lot::RwLock as SyncRwLock;
use tokio::sync::Mutex as AsyncMutex;
use vpn_types::{Credentials, KillSwitchSetting, ServerDescriptor, Settings};

use crate::connection::{Connection, ConnectionFactory, Dispatch, EventSink};
use crate::error::ConnectorError;
use crate::event::Event;
use crate::persistence::PersistenceStore;
use crate::publisher::{Publisher, Subscriber};
use crate::registry;
use crate::state::{State, StateContext, Transition};
use crate::states;

/// Singleton owner of the current connection state (§4.8). `state` is both
/// the lock and the value, matching the spec's "single mutex serializing
/// event processing" design: the lock is a `tokio::sync::Mutex` rather than
/// a synchronous one because it is held across the whole dispatch loop,
/// including the `.await` on each state's spawned task.
pub struct Connector {
    state: AsyncMutex<State>,
    publisher: Publisher,
    killswitch: SyncRwLock<KillSwitchSetting>,
    self_ref: OnceCell<Weak<Connector>>,
}

static INSTANCE: once_cell::sync::Lazy<AsyncMutex<Option<Arc<Connector>>>> =
    once_cell::sync::Lazy::new(|| AsyncMutex::new(None));

impl Connector {
    /// Returns the singleton, bootstrapping it on first call by probing
    /// persistence for a connection to reconstruct. Holding the singleton
    /// mutex across the whole bootstrap (rather than a double-checked-lock
    /// pattern) guarantees exactly one bootstrap ever runs, even if
    /// `get_instance` is called concurrently from multiple tasks.
    pub async fn get_instance() -> Arc<Connector> {
        let mut slot = INSTANCE.lock().await;
        if let Some(existing) = slot.as_ref() {
            return existing.clone();
        }
        let connector = Connector::bootstrap().await;
        *slot = Some(connector.clone());
        connector
    }

    /// Resets the singleton so the next `get_instance` bootstraps fresh.
    /// Test-only: production code never needs to un-bootstrap the engine.
    #[cfg(test)]
    pub async fn reset_instance_for_test() {
        *INSTANCE.lock().await = None;
    }

    async fn bootstrap() -> Arc<Connector> {
        let initial_state = Connector::recover_initial_state().await;

        let connector = Arc::new(Connector {
            state: AsyncMutex::new(initial_state),
            publisher: Publisher::new(),
            killswitch: SyncRwLock::new(KillSwitchSetting::Off),
            self_ref: OnceCell::new(),
        });
        let _ = connector.self_ref.set(Arc::downgrade(&connector));

        let connection = connector.state.lock().await.connection().cloned();
        if let Some(connection) = connection {
            connection.register(connector.event_sink()).await;
        }

        connector
    }

    /// Probes persistence at startup (§4.8, E5): if a record exists and its
    /// backend tag is still registered, asks the backend to reconstruct a
    /// `Connection` and reports its `initial_state`. A missing, malformed, or
    /// now-unregistered backend falls back to `Disconnected` (§7 "Backend
    /// capability absence"). Backends must have registered themselves with
    /// [`registry::global`] before the first `get_instance` call for recovery
    /// to see them here.
    async fn recover_initial_state() -> State {
        let store = match PersistenceStore::open().await {
            Ok(store) => store,
            Err(err) => {
                log::error!(
                    "category=CONN, subcategory=PERSISTENCE, event=LOAD: could not open persistence store: {}",
                    err
                );
                return State::Disconnected(StateContext::new(None));
            }
        };

        let params = match store.load().await {
            Some(params) => params,
            None => return State::Disconnected(StateContext::new(None)),
        };

        match registry::global().reconstruct(&params.backend, &params).await {
            Some(connection) => connection.initial_state(&params).await,
            None => {
                log::warn!(
                    "persisted backend '{}' is no longer registered, discarding persisted connection",
                    params.backend
                );
                State::Disconnected(StateContext::new(None))
            }
        }
    }

    fn event_sink(&self) -> EventSink {
        EventSink::new(self.self_ref.get().cloned().expect("self_ref is set before the connector is used"))
    }

    /// Registers a backend factory under `tag` in the global registry
    /// (§4.9). Intended to be called by backend crates (out of scope here)
    /// before the first `connect()`; exposed on `Connector` purely for
    /// discoverability, since it is the type backend authors otherwise
    /// interact with.
    pub fn register_backend(tag: impl Into<String>, factory: Arc<dyn ConnectionFactory>) {
        registry::global().register_backend(tag, factory);
    }

    /// Builds a new `Connection` via the backend registry, registers this
    /// connector's callback on it, and injects `Up` (§4.8, §6.1).
    pub async fn connect(
        &self,
        server: ServerDescriptor,
        credentials: Credentials,
        settings: Settings,
        protocol: Option<&str>,
        backend: Option<&str>,
    ) -> Result<(), ConnectorError> {
        let tag = registry::global().select_backend(backend)?;
        let protocol = protocol.unwrap_or("auto");
        *self.killswitch.write() = settings.killswitch;

        let connection = registry::global().create(&tag, server, credentials, settings, protocol).await?;
        connection.register(self.event_sink()).await;

        self.dispatch(Event::up(Some(connection))).await
    }

    /// Injects `Down(current_connection)` (§4.8, §6.1).
    pub async fn disconnect(&self) -> Result<(), ConnectorError> {
        let connection = self.current_connection().await;
        self.dispatch(Event::down(connection)).await
    }

    pub fn subscribe(&self, subscriber: Subscriber) {
        self.publisher.register(subscriber);
    }

    pub fn unsubscribe(&self, subscriber: &Subscriber) {
        self.publisher.unregister(subscriber);
    }

    pub async fn current_state(&self) -> State {
        self.state.lock().await.clone()
    }

    pub async fn current_connection(&self) -> Option<Arc<dyn Connection>> {
        self.state.lock().await.connection().cloned()
    }

    pub async fn current_server_id(&self) -> Option<String> {
        self.current_connection().await.map(|connection| connection.server_id().to_string())
    }

    pub async fn is_connection_ongoing(&self) -> bool {
        self.state.lock().await.is_ongoing()
    }
}

#[async_trait]
impl Dispatch for Connector {
    /// The event-dispatch algorithm (§4.8). Acquires the dispatch lock for
    /// the full cascade: each iteration computes the pure transition, commits
    /// it, spawns the new state's tasks concurrently with notifying
    /// subscribers, then awaits the tasks for a possible follow-up event.
    /// The lock is held across every `.await` in this loop by design, see
    /// §5 "Suspension points".
    async fn dispatch(&self, event: Event) -> Result<(), ConnectorError> {
        let mut state_guard = self.state.lock().await;
        let mut pending = Some(event);
        let mut cascades = 0u32;

        while let Some(ev) = pending.take() {
            cascades += 1;
            if cascades > 99 {
                log::error!("dispatch aborted: cascading state transitions exceeded the safety bound");
                return Err(ConnectorError::CascadeLimitExceeded);
            }

            let current = state_guard.clone();
            let transition = current.on_event(ev)?;

            let next_state = match transition {
                Transition::Unchanged(state) => {
                    *state_guard = state;
                    break;
                }
                Transition::Changed(state) => state,
            };

            *state_guard = next_state.clone();
            log::info!("state changed to {}", next_state.name());

            if !next_state.is_ongoing() {
                if let Some(connection) = next_state.connection() {
                    connection.unregister().await;
                }
            }

            let killswitch = *self.killswitch.read();
            let state_for_tasks = next_state.clone();
            let tasks = tokio::spawn(async move { states::run_tasks(&state_for_tasks, killswitch).await });

            self.publisher.notify(&next_state).await;

            pending = tasks.await.map_err(|_| ConnectorError::TaskPanicked)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc as StdArc;

    use async_trait::async_trait;
    use parking_lot::Mutex as SyncMutex;
    use vpn_types::{
        ConnectionId, Credentials, KillSwitchSetting, PersistedParameters, ServerDescriptor, Settings,
        UserPassCredentials,
    };

    use crate::connection::EventSink;
    use crate::state::StateContext;

    use super::*;

    /// Serializes the scenario tests below, since `Connector::get_instance`
    /// and the backend registry are process-wide singletons: without this,
    /// tests running concurrently in the same binary would race on the same
    /// global state.
    static TEST_GUARD: once_cell::sync::Lazy<AsyncMutex<()>> = once_cell::sync::Lazy::new(|| AsyncMutex::new(()));

    struct FakeConnection {
        id: ConnectionId,
        server: ServerDescriptor,
        sink: AsyncMutex<Option<EventSink>>,
        trace: StdArc<SyncMutex<Vec<String>>>,
        initial_state: SyncMutex<Option<State>>,
    }

    impl FakeConnection {
        fn new(server: ServerDescriptor, trace: StdArc<SyncMutex<Vec<String>>>) -> StdArc<Self> {
            StdArc::new(FakeConnection {
                id: ConnectionId::generate(),
                server,
                sink: AsyncMutex::new(None),
                trace,
                initial_state: SyncMutex::new(None),
            })
        }

        fn with_initial_state(self: &StdArc<Self>, state: State) {
            *self.initial_state.lock() = Some(state);
        }

        async fn emit(&self, event: Event) {
            let sink = self.sink.lock().await.clone();
            if let Some(sink) = sink {
                sink.emit(event).await;
            }
        }
    }

    #[async_trait]
    impl Connection for FakeConnection {
        fn connection_id(&self) -> &ConnectionId {
            &self.id
        }

        fn server_id(&self) -> &str {
            &self.server.server_id
        }

        fn server(&self) -> &ServerDescriptor {
            &self.server
        }

        fn backend_tag(&self) -> &str {
            "fake"
        }

        fn protocol_tag(&self) -> &str {
            "fake"
        }

        async fn start(&self) {
            self.trace.lock().push("start".to_string());
        }

        async fn stop(&self) {
            self.trace.lock().push("stop".to_string());
        }

        async fn register(&self, sink: EventSink) {
            *self.sink.lock().await = Some(sink);
        }

        async fn unregister(&self) {
            *self.sink.lock().await = None;
        }

        async fn enable_ipv6_leak_protection(&self) {
            self.trace.lock().push("enable_ipv6_leak_protection".to_string());
        }

        async fn disable_ipv6_leak_protection(&self) {
            self.trace.lock().push("disable_ipv6_leak_protection".to_string());
        }

        async fn enable_killswitch(&self, server: Option<&ServerDescriptor>) {
            self.trace.lock().push(if server.is_some() { "enable_killswitch_routed" } else { "enable_killswitch_full" }.to_string());
        }

        async fn disable_killswitch(&self) {
            self.trace.lock().push("disable_killswitch".to_string());
        }

        async fn add_persistence(&self) {
            self.trace.lock().push("add_persistence".to_string());
        }

        async fn remove_persistence(&self) {
            self.trace.lock().push("remove_persistence".to_string());
        }

        async fn initial_state(&self, _params: &PersistedParameters) -> State {
            self.initial_state.lock().clone().unwrap_or_else(|| State::Disconnected(StateContext::new(None)))
        }
    }

    struct FakeFactory {
        trace: StdArc<SyncMutex<Vec<String>>>,
        created: StdArc<SyncMutex<Vec<StdArc<FakeConnection>>>>,
        /// When set, `reconstruct` reports the reattached connection as
        /// already `Connected` (§4.8, E5) instead of the default
        /// `Disconnected`.
        reconstruct_as_connected: SyncMutex<bool>,
    }

    impl FakeFactory {
        fn new(trace: StdArc<SyncMutex<Vec<String>>>) -> Self {
            FakeFactory {
                trace,
                created: StdArc::new(SyncMutex::new(Vec::new())),
                reconstruct_as_connected: SyncMutex::new(false),
            }
        }
    }

    #[async_trait]
    impl ConnectionFactory for FakeFactory {
        fn priority(&self) -> i32 {
            1
        }

        fn validate(&self) -> bool {
            true
        }

        async fn create(
            &self,
            server: ServerDescriptor,
            _credentials: Credentials,
            _settings: Settings,
            _protocol: &str,
        ) -> Arc<dyn Connection> {
            let connection = FakeConnection::new(server, self.trace.clone());
            self.created.lock().push(connection.clone());
            connection
        }

        async fn reconstruct(&self, params: &PersistedParameters) -> Arc<dyn Connection> {
            let server = ServerDescriptor::new(
                "0.0.0.0".parse().unwrap(),
                "reconstructed.invalid",
                params.server_id.clone(),
                params.server_name.clone(),
            );
            let connection = FakeConnection::new(server, self.trace.clone());
            if *self.reconstruct_as_connected.lock() {
                let as_dyn = connection.clone() as Arc<dyn Connection>;
                connection.with_initial_state(State::Connected(StateContext::new(Some(as_dyn))));
            }
            self.created.lock().push(connection.clone());
            connection
        }
    }

    fn server(tag: &str) -> ServerDescriptor {
        ServerDescriptor::new("10.0.0.1".parse().unwrap(), "example.com", format!("srv-{tag}"), format!("US#{tag}"))
    }

    fn credentials() -> Credentials {
        Credentials::new(Some(UserPassCredentials { username: "u".into(), password: "p".into() }), None).unwrap()
    }

    fn settings_off() -> Settings {
        Settings { killswitch: KillSwitchSetting::Off, ..Default::default() }
    }

    async fn fresh_connector_with_backend() -> (Arc<Connector>, StdArc<FakeFactory>, StdArc<SyncMutex<Vec<String>>>) {
        Connector::reset_instance_for_test().await;
        let trace = StdArc::new(SyncMutex::new(Vec::new()));
        let factory = StdArc::new(FakeFactory::new(trace.clone()));
        Connector::register_backend("fake", factory.clone());
        let connector = Connector::get_instance().await;
        (connector, factory, trace)
    }

    /// Property 5 (§8): two calls to `get_instance` return the same
    /// instance.
    #[tokio::test]
    async fn singleton_invariant() {
        let _guard = TEST_GUARD.lock().await;
        Connector::reset_instance_for_test().await;

        let first = Connector::get_instance().await;
        let second = Connector::get_instance().await;
        assert!(Arc::ptr_eq(&first, &second));
    }

    /// E1: happy path from a cold `Disconnected` start through to
    /// `Connected`, with the side-effect trace the spec prescribes.
    #[tokio::test]
    async fn e1_happy_path() {
        let _guard = TEST_GUARD.lock().await;
        let (connector, factory, trace) = fresh_connector_with_backend().await;
        assert!(matches!(connector.current_state().await, State::Disconnected(_)));

        connector.connect(server("a"), credentials(), settings_off(), None, Some("fake")).await.unwrap();
        assert!(matches!(connector.current_state().await, State::Connecting(_)));

        let conn = factory.created.lock()[0].clone();
        conn.emit(Event::connected(Some(conn.clone() as Arc<dyn Connection>))).await;

        assert!(matches!(connector.current_state().await, State::Connected(_)));
        assert_eq!(
            trace.lock().clone(),
            vec!["enable_ipv6_leak_protection", "start", "add_persistence"]
        );
    }

    /// E2: clean teardown from `Connected` back to `Disconnected`.
    #[tokio::test]
    async fn e2_clean_teardown() {
        let _guard = TEST_GUARD.lock().await;
        let (connector, factory, trace) = fresh_connector_with_backend().await;

        connector.connect(server("a"), credentials(), settings_off(), None, Some("fake")).await.unwrap();
        let conn = factory.created.lock()[0].clone();
        conn.emit(Event::connected(Some(conn.clone() as Arc<dyn Connection>))).await;
        trace.lock().clear();

        connector.disconnect().await.unwrap();
        assert!(matches!(connector.current_state().await, State::Disconnecting(_)));

        conn.emit(Event::disconnected(Some(conn.clone() as Arc<dyn Connection>))).await;

        assert!(matches!(connector.current_state().await, State::Disconnected(_)));
        let recorded = trace.lock().clone();
        assert_eq!(recorded[0], "stop");
        let mut teardown: Vec<&String> = recorded[1..].iter().collect();
        teardown.sort();
        assert_eq!(
            teardown,
            vec!["disable_ipv6_leak_protection", "disable_killswitch", "remove_persistence"]
        );
    }

    /// E3: an auth failure from `Connecting` lands in `Error` without
    /// relaxing leak protection; only the follow-up `disconnect()`
    /// disables it.
    #[tokio::test]
    async fn e3_authentication_failure() {
        let _guard = TEST_GUARD.lock().await;
        let (connector, factory, trace) = fresh_connector_with_backend().await;

        connector.connect(server("a"), credentials(), settings_off(), None, Some("fake")).await.unwrap();
        let conn = factory.created.lock()[0].clone();
        conn.emit(Event::auth_denied(Some(conn.clone() as Arc<dyn Connection>), "bad creds")).await;

        assert!(matches!(connector.current_state().await, State::Error(_)));
        assert!(!trace.lock().contains(&"disable_ipv6_leak_protection".to_string()));

        connector.disconnect().await.unwrap();
        assert!(matches!(connector.current_state().await, State::Disconnected(_)));
        assert!(trace.lock().contains(&"disable_ipv6_leak_protection".to_string()));
    }

    /// E4 / property 4: reconnecting while `Connected` never disables leak
    /// protection between the old and new session.
    #[tokio::test]
    async fn e4_reconnection_preserves_leak_protection() {
        let _guard = TEST_GUARD.lock().await;
        let (connector, factory, trace) = fresh_connector_with_backend().await;

        connector.connect(server("a"), credentials(), settings_off(), None, Some("fake")).await.unwrap();
        let conn_a = factory.created.lock()[0].clone();
        conn_a.emit(Event::connected(Some(conn_a.clone() as Arc<dyn Connection>))).await;
        assert!(matches!(connector.current_state().await, State::Connected(_)));

        connector.connect(server("b"), credentials(), settings_off(), None, Some("fake")).await.unwrap();
        assert!(matches!(connector.current_state().await, State::Disconnecting(_)));

        conn_a.emit(Event::disconnected(Some(conn_a.clone() as Arc<dyn Connection>))).await;

        // Disconnected(reconn=connB).run_tasks synthesizes Up(connB) within
        // the same dispatch call, so by the time emit() returns, the engine
        // has already moved on to Connecting(connB).
        assert!(matches!(connector.current_state().await, State::Connecting(_)));

        let conn_b = factory.created.lock()[1].clone();
        conn_b.emit(Event::connected(Some(conn_b.clone() as Arc<dyn Connection>))).await;
        assert!(matches!(connector.current_state().await, State::Connected(_)));

        let recorded = trace.lock().clone();
        assert_eq!(recorded.iter().filter(|e| *e == "enable_ipv6_leak_protection").count(), 2);
        assert!(!recorded.contains(&"disable_ipv6_leak_protection".to_string()));
    }

    /// E5: crash recovery reconstructs `Connected` from a persisted record
    /// without issuing a fresh `start()`.
    #[tokio::test]
    async fn e5_crash_recovery() {
        let _guard = TEST_GUARD.lock().await;
        Connector::reset_instance_for_test().await;

        let trace = StdArc::new(SyncMutex::new(Vec::new()));
        let factory = StdArc::new(FakeFactory::new(trace.clone()));

        let params = PersistedParameters {
            connection_id: ConnectionId::generate(),
            backend: "fake".to_string(),
            protocol: "fake".to_string(),
            server_id: "srv-9".to_string(),
            server_name: "US#9".to_string(),
            killswitch: 1,
        };

        let store = PersistenceStore::open().await.unwrap();
        store.save(&params).await.unwrap();

        *factory.reconstruct_as_connected.lock() = true;
        Connector::register_backend("fake", factory.clone());

        let connector = Connector::get_instance().await;

        assert!(matches!(connector.current_state().await, State::Connected(_)));
        assert_eq!(connector.current_server_id().await.as_deref(), Some("srv-9"));
        assert!(!trace.lock().contains(&"start".to_string()));
        assert_eq!(factory.created.lock().len(), 1);

        store.remove().await.unwrap();
    }

    /// E6: a user `Down` racing a backend-originated `Disconnected` settles
    /// on `Disconnected` regardless of arrival order, since both are fully
    /// serialized under the dispatch lock.
    #[tokio::test]
    async fn e6_race_between_down_and_backend_disconnected() {
        let _guard = TEST_GUARD.lock().await;
        let (connector, factory, _trace) = fresh_connector_with_backend().await;

        connector.connect(server("a"), credentials(), settings_off(), None, Some("fake")).await.unwrap();
        let conn = factory.created.lock()[0].clone();
        assert!(matches!(connector.current_state().await, State::Connecting(_)));

        let disconnect = connector.disconnect();
        let backend_drop = conn.emit(Event::disconnected(Some(conn.clone() as Arc<dyn Connection>)));
        let (disconnect_result, ()) = tokio::join!(disconnect, backend_drop);
        disconnect_result.unwrap();

        assert!(matches!(connector.current_state().await, State::Disconnected(_)));
        assert!(!connector.is_connection_ongoing().await);
    }
}
