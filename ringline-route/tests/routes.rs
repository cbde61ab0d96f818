use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll, Waker};

use ringline_exec::{Executor, yield_now};
use ringline_route::{
    AllAsyncRoute, AllFastestRoute, AllInitialRoute, AllMajorityRoute, AllSyncRoute, Error,
    ErrorRoute, HashRoute, KetamaHash, Md5Hash, NullRoute, Operation, Reply, Request, ResultCode,
    RouteFuture, RouteHandle, RouteHandlePtr, traverse,
};

// -- Test doubles --

/// Holds routed requests until opened.
#[derive(Default)]
struct Gate {
    state: Mutex<(bool, Vec<Waker>)>,
}

impl Gate {
    fn open(&self) {
        let wakers = {
            let mut state = self.state.lock().unwrap();
            state.0 = true;
            std::mem::take(&mut state.1)
        };
        for w in wakers {
            w.wake();
        }
    }

    fn wait(&self) -> GateWait<'_> {
        GateWait { gate: self }
    }
}

struct GateWait<'a> {
    gate: &'a Gate,
}

impl Future for GateWait<'_> {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        let mut state = self.gate.state.lock().unwrap();
        if state.0 {
            Poll::Ready(())
        } else {
            state.1.push(cx.waker().clone());
            Poll::Pending
        }
    }
}

/// Leaf that records every key it sees and answers with a fixed reply.
struct TestRoute {
    result: ResultCode,
    value: &'static str,
    delay: usize,
    gate: Option<Arc<Gate>>,
    saw_keys: Mutex<Vec<String>>,
}

impl TestRoute {
    fn new(result: ResultCode, value: &'static str) -> Arc<Self> {
        Self::build(result, value, 0, None)
    }

    fn delayed(result: ResultCode, value: &'static str, delay: usize) -> Arc<Self> {
        Self::build(result, value, delay, None)
    }

    fn paused(result: ResultCode, value: &'static str, gate: Arc<Gate>) -> Arc<Self> {
        Self::build(result, value, 0, Some(gate))
    }

    fn build(
        result: ResultCode,
        value: &'static str,
        delay: usize,
        gate: Option<Arc<Gate>>,
    ) -> Arc<Self> {
        Arc::new(TestRoute {
            result,
            value,
            delay,
            gate,
            saw_keys: Mutex::new(Vec::new()),
        })
    }

    fn saw_keys(&self) -> Vec<String> {
        self.saw_keys.lock().unwrap().clone()
    }
}

impl RouteHandle for TestRoute {
    fn name(&self) -> &str {
        "test"
    }

    fn route(&self, req: Request) -> RouteFuture<'_> {
        Box::pin(async move {
            if let Some(gate) = &self.gate {
                gate.wait().await;
            }
            for _ in 0..self.delay {
                yield_now().await;
            }
            let key = String::from_utf8_lossy(req.key()).into_owned();
            self.saw_keys.lock().unwrap().push(key);
            Reply::new(self.result).with_value(self.value)
        })
    }
}

fn ptrs(children: &[Arc<TestRoute>]) -> Vec<RouteHandlePtr> {
    children
        .iter()
        .map(|c| c.clone() as RouteHandlePtr)
        .collect()
}

fn route(ex: &Executor, root: RouteHandlePtr, req: Request) -> Reply {
    ex.block_on(async move { root.route(req).await }).unwrap()
}

fn count_reachable(root: &dyn RouteHandle, req: &Request) -> usize {
    let mut visited = 0;
    traverse(root, req, |_, _| visited += 1);
    visited
}

// -- Leaves --

#[test]
fn null_route_defaults() {
    let ex = Executor::new();
    let root: RouteHandlePtr = Arc::new(NullRoute);
    let cases = [
        (Operation::Get, ResultCode::NotFound),
        (Operation::Set, ResultCode::NotStored),
        (Operation::Delete, ResultCode::NotFound),
        (Operation::Touch, ResultCode::NotFound),
        (Operation::Incr, ResultCode::NotFound),
        (Operation::Append, ResultCode::NotStored),
        (Operation::Prepend, ResultCode::NotStored),
    ];
    for (op, expected) in cases {
        let reply = route(&ex, root.clone(), Request::new(op, "key"));
        assert_eq!(reply.result(), expected, "{op}");
    }
}

#[test]
fn error_route_fails_everything() {
    let ex = Executor::new();
    let root: RouteHandlePtr = Arc::new(ErrorRoute::new("backend unavailable"));
    let reply = route(&ex, root, Request::set("key", "value"));
    assert_eq!(reply.result(), ResultCode::LocalError);
    assert_eq!(reply.message(), Some("backend unavailable"));
}

// -- Fanout --

#[test]
fn all_sync_returns_worst_reply() {
    let ex = Executor::new();
    let children = [
        TestRoute::new(ResultCode::Found, "a"),
        TestRoute::delayed(ResultCode::NotFound, "b", 2),
        TestRoute::new(ResultCode::RemoteError, "c"),
    ];
    let root: RouteHandlePtr = Arc::new(AllSyncRoute::new(ptrs(&children)));

    let reply = route(&ex, root, Request::get("key"));
    assert_eq!(reply.result(), ResultCode::RemoteError);
    assert_eq!(reply.value().as_ref(), b"c");
    for child in &children {
        assert_eq!(child.saw_keys(), ["key"]);
    }
}

#[test]
fn all_sync_without_children() {
    let ex = Executor::new();
    let root: RouteHandlePtr = Arc::new(AllSyncRoute::new(Vec::new()));
    let reply = route(&ex, root, Request::set("key", "v"));
    assert_eq!(reply.result(), ResultCode::NotStored);
}

#[test]
fn all_async_replies_default_and_finishes_children() {
    let ex = Executor::new();
    let gate = Arc::new(Gate::default());
    let children = [
        TestRoute::new(ResultCode::Found, "a"),
        TestRoute::paused(ResultCode::Found, "b", gate.clone()),
    ];
    let root: RouteHandlePtr = Arc::new(AllAsyncRoute::new(ptrs(&children)));

    let reply = route(&ex, root, Request::get("key"));
    assert_eq!(reply.result(), ResultCode::NotFound);
    assert_eq!(children[0].saw_keys(), ["key"]);
    assert!(children[1].saw_keys().is_empty());

    gate.open();
    ex.run_until_stalled();
    assert_eq!(children[1].saw_keys(), ["key"]);
    assert_eq!(ex.task_count(), 0);
}

#[test]
fn all_initial_returns_first_child() {
    let ex = Executor::new();
    let children = [
        TestRoute::delayed(ResultCode::Found, "a", 3),
        TestRoute::new(ResultCode::NotFound, "b"),
        TestRoute::new(ResultCode::RemoteError, "c"),
    ];
    let all_initial = AllInitialRoute::new(ptrs(&children));
    let req = Request::get("key");
    assert_eq!(count_reachable(&all_initial, &req), 3);

    let reply = route(&ex, Arc::new(all_initial), req);
    assert_eq!(reply.result(), ResultCode::Found);
    assert_eq!(reply.value().as_ref(), b"a");
    for child in &children {
        assert_eq!(child.saw_keys(), ["key"]);
    }
}

#[test]
fn all_initial_leaves_slow_children_running() {
    let ex = Executor::new();
    let gate = Arc::new(Gate::default());
    let children = [
        TestRoute::new(ResultCode::Stored, "a"),
        TestRoute::paused(ResultCode::Stored, "b", gate.clone()),
    ];
    let root: RouteHandlePtr = Arc::new(AllInitialRoute::new(ptrs(&children)));

    let reply = route(&ex, root, Request::set("key", "v"));
    assert_eq!(reply.result(), ResultCode::Stored);
    assert!(children[1].saw_keys().is_empty());
    assert_eq!(ex.task_count(), 1);

    gate.open();
    ex.run_until_stalled();
    assert_eq!(children[1].saw_keys(), ["key"]);
}

#[test]
fn all_majority_answers_without_paused_child() {
    let ex = Executor::new();
    let gate = Arc::new(Gate::default());
    let children = [
        TestRoute::new(ResultCode::RemoteError, "a"),
        TestRoute::paused(ResultCode::NotFound, "b", gate.clone()),
        TestRoute::new(ResultCode::RemoteError, "c"),
    ];
    let root: RouteHandlePtr = Arc::new(AllMajorityRoute::new(ptrs(&children)));

    let reply = route(&ex, root, Request::get("key"));
    assert_eq!(reply.result(), ResultCode::RemoteError);
    assert_eq!(children[0].saw_keys(), ["key"]);
    assert!(children[1].saw_keys().is_empty());
    assert_eq!(children[2].saw_keys(), ["key"]);

    gate.open();
    ex.run_until_stalled();
    assert_eq!(children[1].saw_keys(), ["key"]);
}

#[test]
fn all_majority_with_even_children() {
    let ex = Executor::new();
    let gate = Arc::new(Gate::default());
    let children = [
        TestRoute::new(ResultCode::RemoteError, "a"),
        TestRoute::delayed(ResultCode::NotFound, "b", 1),
        TestRoute::delayed(ResultCode::NotFound, "c", 2),
        TestRoute::paused(ResultCode::RemoteError, "d", gate.clone()),
    ];
    let all_majority = AllMajorityRoute::new(ptrs(&children));
    assert_eq!(all_majority.quorum(), 3);

    // The quorum is {remote error, not found, not found}. Most replies say
    // not found, but the worst of them decides.
    let reply = route(&ex, Arc::new(all_majority), Request::get("key"));
    assert_eq!(reply.result(), ResultCode::RemoteError);
    assert_eq!(reply.value().as_ref(), b"a");
    assert!(children[3].saw_keys().is_empty());

    gate.open();
    ex.run_until_stalled();
    assert_eq!(children[3].saw_keys(), ["key"]);
}

#[test]
fn all_majority_ignores_replies_past_quorum() {
    let ex = Executor::new();
    let children = [
        TestRoute::new(ResultCode::Found, "a"),
        TestRoute::delayed(ResultCode::RemoteError, "b", 5),
        TestRoute::new(ResultCode::Found, "c"),
    ];
    let root: RouteHandlePtr = Arc::new(AllMajorityRoute::new(ptrs(&children)));

    let reply = route(&ex, root, Request::get("key"));
    assert_eq!(reply.result(), ResultCode::Found);
    assert_eq!(reply.value().as_ref(), b"a");
    assert_eq!(children[1].saw_keys(), ["key"]);
}

#[test]
fn all_fastest_returns_first_success() {
    let ex = Executor::new();
    let gate = Arc::new(Gate::default());
    let children = [
        TestRoute::new(ResultCode::RemoteError, "a"),
        TestRoute::paused(ResultCode::NotFound, "b", gate.clone()),
        TestRoute::delayed(ResultCode::Found, "c", 1),
    ];
    let root: RouteHandlePtr = Arc::new(AllFastestRoute::new(ptrs(&children)));

    let reply = route(&ex, root, Request::get("key"));
    assert_eq!(reply.result(), ResultCode::Found);
    assert_eq!(reply.value().as_ref(), b"c");

    gate.open();
    ex.run_until_stalled();
    assert_eq!(children[1].saw_keys(), ["key"]);
}

#[test]
fn all_fastest_returns_last_error_when_all_fail() {
    let ex = Executor::new();
    let children = [
        TestRoute::new(ResultCode::RemoteError, "a"),
        TestRoute::delayed(ResultCode::Timeout, "b", 2),
    ];
    let root: RouteHandlePtr = Arc::new(AllFastestRoute::new(ptrs(&children)));

    let reply = route(&ex, root, Request::get("key"));
    assert_eq!(reply.result(), ResultCode::Timeout);
    assert_eq!(reply.value().as_ref(), b"b");
}

#[test]
fn fanout_outside_executor_is_local_error() {
    let children = [TestRoute::new(ResultCode::Found, "a")];
    let root = AllInitialRoute::new(ptrs(&children));
    let mut fut = root.route(Request::get("key"));
    let mut cx = Context::from_waker(Waker::noop());
    match fut.as_mut().poll(&mut cx) {
        Poll::Ready(reply) => assert_eq!(reply.result(), ResultCode::LocalError),
        Poll::Pending => panic!("dispatch failure must resolve immediately"),
    }
    assert!(children[0].saw_keys().is_empty());
}

// -- Hash --

fn numeric_hash(key: &[u8]) -> usize {
    std::str::from_utf8(key).unwrap().parse().unwrap()
}

#[test]
fn hash_without_salt() {
    let ex = Executor::new();
    let children = [
        TestRoute::new(ResultCode::Found, "a"),
        TestRoute::new(ResultCode::Found, "b"),
        TestRoute::new(ResultCode::Found, "c"),
    ];
    let root: RouteHandlePtr =
        Arc::new(HashRoute::new(ptrs(&children), "", numeric_hash).unwrap());

    for (key, expected) in [("0", "a"), ("1", "b"), ("2", "c")] {
        let reply = route(&ex, root.clone(), Request::get(key));
        assert_eq!(reply.value().as_ref(), expected.as_bytes(), "key {key}");
    }
}

#[test]
fn hash_with_salt() {
    let ex = Executor::new();
    let children = [
        TestRoute::new(ResultCode::Found, "a"),
        TestRoute::new(ResultCode::Found, "b"),
        TestRoute::new(ResultCode::Found, "c"),
    ];
    let root: RouteHandlePtr =
        Arc::new(HashRoute::new(ptrs(&children), "1", numeric_hash).unwrap());

    for (key, expected) in [("0", "b"), ("1", "c"), ("2", "a")] {
        let reply = route(&ex, root.clone(), Request::get(key));
        assert_eq!(reply.value().as_ref(), expected.as_bytes(), "key {key}");
    }
}

#[test]
fn hash_is_stable_across_calls() {
    let ex = Executor::new();
    for salt in ["", "pool-7"] {
        let children = [
            TestRoute::new(ResultCode::Found, "a"),
            TestRoute::new(ResultCode::Found, "b"),
            TestRoute::new(ResultCode::Found, "c"),
        ];
        let hash = Arc::new(HashRoute::new(ptrs(&children), salt, Md5Hash).unwrap());
        let owner = hash.pick(b"user:42");

        for _ in 0..5 {
            assert_eq!(hash.pick(b"user:42"), owner);
            let reply = route(&ex, hash.clone(), Request::get("user:42"));
            assert_eq!(reply.value().as_ref(), [b'a' + owner as u8], "salt {salt:?}");
        }
        for (i, child) in children.iter().enumerate() {
            let expected = if i == owner { 5 } else { 0 };
            assert_eq!(child.saw_keys().len(), expected, "salt {salt:?} child {i}");
        }
    }
}

#[test]
fn hash_route_with_md5_picks_digest_bucket() {
    let ex = Executor::new();
    let children = [
        TestRoute::new(ResultCode::Found, "a"),
        TestRoute::new(ResultCode::Found, "b"),
        TestRoute::new(ResultCode::Found, "c"),
    ];

    // md5("abc") starts 90 01 50 98: 0x98500190 % 3 == 2.
    let plain: RouteHandlePtr =
        Arc::new(HashRoute::new(ptrs(&children), "", Md5Hash).unwrap());
    for (key, expected) in [("abc", "c"), ("foo", "b"), ("bar", "c")] {
        let reply = route(&ex, plain.clone(), Request::get(key));
        assert_eq!(reply.value().as_ref(), expected.as_bytes(), "key {key}");
    }

    let salted: RouteHandlePtr =
        Arc::new(HashRoute::new(ptrs(&children), "1", Md5Hash).unwrap());
    for (key, expected) in [("abc", "b"), ("foo", "c"), ("bar", "a")] {
        let reply = route(&ex, salted.clone(), Request::get(key));
        assert_eq!(reply.value().as_ref(), expected.as_bytes(), "salted key {key}");
    }
    assert_eq!(children[0].saw_keys(), ["bar"]);
}

#[test]
fn hash_route_with_ketama_picks_ring_owner() {
    let ex = Executor::new();
    let servers = ["cache-a:11211", "cache-b:11211", "cache-c:11211"];
    let children = [
        TestRoute::new(ResultCode::Found, "a"),
        TestRoute::new(ResultCode::Found, "b"),
        TestRoute::new(ResultCode::Found, "c"),
    ];

    let ring = KetamaHash::new(&servers).unwrap();
    let plain: RouteHandlePtr =
        Arc::new(HashRoute::new(ptrs(&children), "", ring.clone()).unwrap());
    for (key, owner) in [("foo", 2), ("bar", 1), ("baz", 1), ("abc", 1)] {
        assert_eq!(ring.node_for(key.as_bytes()), owner, "key {key}");
        let expected = [b'a' + owner as u8];
        let reply = route(&ex, plain.clone(), Request::get(key));
        assert_eq!(reply.value().as_ref(), expected, "key {key}");
    }

    // The salt reaches the ring: "abc1" lands on another node than "abc".
    let salted = HashRoute::new(ptrs(&children), "1", ring).unwrap();
    assert_eq!(salted.pick(b"abc"), 0);
    let reply = route(&ex, Arc::new(salted), Request::get("abc"));
    assert_eq!(reply.value().as_ref(), b"a");
    assert_eq!(children[0].saw_keys(), ["abc"]);
}

#[test]
fn hash_traverse_visits_selected_child_only() {
    let children = [
        TestRoute::new(ResultCode::Found, "a"),
        TestRoute::new(ResultCode::Found, "b"),
    ];
    let hash = HashRoute::new(ptrs(&children), "", numeric_hash).unwrap();
    assert_eq!(hash.pick(b"1"), 1);
    assert_eq!(count_reachable(&hash, &Request::get("1")), 1);
}

#[test]
fn hash_requires_children() {
    let err = HashRoute::new(Vec::new(), "", numeric_hash).err();
    assert_eq!(err, Some(Error::NoChildren("hash")));
}

#[test]
fn traverse_descends_into_composites() {
    let leaves = [
        TestRoute::new(ResultCode::Found, "a"),
        TestRoute::new(ResultCode::Found, "b"),
        TestRoute::new(ResultCode::Found, "c"),
    ];
    let hash: RouteHandlePtr =
        Arc::new(HashRoute::new(ptrs(&leaves[..2]), "", numeric_hash).unwrap());
    let root = AllSyncRoute::new(vec![hash, leaves[2].clone() as RouteHandlePtr]);

    let mut names = Vec::new();
    traverse(&root, &Request::get("0"), |handle, _| {
        names.push(handle.name().to_owned())
    });
    assert_eq!(names, ["hash", "test", "test"]);
}
