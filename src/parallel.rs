use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::sync::mpsc::sync_channel;

use parking_lot::{Condvar, Mutex};

/// Produces data for each item of `iter` on worker threads, and consumes the
/// results on the calling thread in the order of `iter`.
///
/// At most `2 * num_threads` results are in flight at any time. If `consume`
/// fails, the workers are stopped and the error is returned.
pub fn parallel_process<Iter, Item, Producer, Data, Consumer, Error>(
    iter: Iter,
    produce: Producer,
    mut consume: Consumer,
) -> Result<(), Error>
where
    Iter: Iterator<Item = Item> + Send,
    Producer: Fn(Item) -> Data + Sync,
    Data: Send,
    Consumer: FnMut(Data) -> Result<(), Error>,
{
    let num_threads = rayon::current_num_threads();

    let iter = Mutex::new(iter.enumerate());
    // index up to which (exclusively) workers may send their results
    let window_end = (Mutex::new(2 * num_threads), Condvar::new());

    crossbeam::scope(|s| {
        let (sender, receiver) = sync_channel(2 * num_threads);
        for _ in 0..num_threads {
            let sender = sender.clone();
            let (iter, produce, window_end) = (&iter, &produce, &window_end);
            s.spawn(move |_| loop {
                let (i, item) = match iter.lock().next() {
                    None => break,
                    Some(x) => x,
                };

                let data = produce(item);

                let (end, cond) = window_end;
                {
                    let mut guard = end.lock();
                    while *guard <= i {
                        cond.wait(&mut guard);
                    }
                }

                if sender.send((i, data)).is_err() {
                    // consumer gave up
                    break;
                }
            });
        }
        // the receiver finishes once all workers are done
        drop(sender);

        let advance = |by: usize| {
            let (end, cond) = &window_end;
            let mut guard = end.lock();
            *guard = guard.saturating_add(by);
            cond.notify_all();
        };

        let mut pending = BTreeMap::new();
        let mut next_idx = 0;
        for (i, data) in receiver.iter() {
            pending.insert(Reverse(i), data);
            while let Some(data) = pending.remove(&Reverse(next_idx)) {
                advance(1);
                next_idx += 1;
                if let Err(e) = consume(data) {
                    // release all waiting workers, their sends fail once the
                    // receiver is dropped
                    advance(usize::MAX);
                    return Err(e);
                }
            }
        }
        Ok(())
    })
    .unwrap_or_else(|e| std::panic::resume_unwind(e))
}
