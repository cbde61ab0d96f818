use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

/// Tracks whether one member of a [`JoinAll`] has completed.
enum MaybeDone<F: Future> {
    Pending(Pin<Box<F>>),
    Done(F::Output),
    Gone,
}

impl<F: Future> MaybeDone<F> {
    /// Poll the member if still pending. Returns true once it has an output.
    fn poll_member(&mut self, cx: &mut Context<'_>) -> bool {
        match self {
            MaybeDone::Pending(future) => match future.as_mut().poll(cx) {
                Poll::Ready(output) => {
                    *self = MaybeDone::Done(output);
                    true
                }
                Poll::Pending => false,
            },
            MaybeDone::Done(_) => true,
            MaybeDone::Gone => false,
        }
    }

    fn take_output(&mut self) -> Option<F::Output> {
        match std::mem::replace(self, MaybeDone::Gone) {
            MaybeDone::Done(output) => Some(output),
            other => {
                *self = other;
                None
            }
        }
    }
}

/// Future returned by [`join_all()`].
#[must_use = "futures do nothing unless awaited"]
pub struct JoinAll<F: Future> {
    members: Vec<MaybeDone<F>>,
}

impl<F: Future> Unpin for JoinAll<F> {}

impl<F: Future> Future for JoinAll<F> {
    type Output = Vec<F::Output>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut all_done = true;
        for member in &mut self.members {
            all_done &= member.poll_member(cx);
        }
        if !all_done {
            return Poll::Pending;
        }
        let outputs = self
            .members
            .iter_mut()
            .filter_map(MaybeDone::take_output)
            .collect();
        Poll::Ready(outputs)
    }
}

/// Poll every future concurrently and return all outputs in input order.
///
/// The futures may borrow from the caller; nothing is spawned. Each member
/// is polled at least once on the first poll, so a slow member never delays
/// the start of the others.
pub fn join_all<I>(futures: I) -> JoinAll<I::Item>
where
    I: IntoIterator,
    I::Item: Future,
{
    JoinAll {
        members: futures
            .into_iter()
            .map(|f| MaybeDone::Pending(Box::pin(f)))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Executor, yield_now};

    #[test]
    fn outputs_keep_input_order() {
        let ex = Executor::new();
        let out = ex
            .block_on(async {
                let futs = (0..4u32).map(|i| async move {
                    for _ in 0..(4 - i) {
                        yield_now().await;
                    }
                    i
                });
                join_all(futs).await
            })
            .unwrap();
        assert_eq!(out, [0, 1, 2, 3]);
    }

    #[test]
    fn empty_is_ready() {
        let ex = Executor::new();
        let out: Vec<u8> = ex
            .block_on(join_all(Vec::<std::future::Ready<u8>>::new()))
            .unwrap();
        assert!(out.is_empty());
    }
}
