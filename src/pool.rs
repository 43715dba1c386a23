use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::thread;

pub fn scatter_gather<I, T, F>(items: &[I], worker_count: usize, work: F) -> Vec<T>
where
    I: Sync,
    T: Send,
    F: Fn(&I) -> T + Send + Sync,
{
    if items.is_empty() {
        return Vec::new();
    }

    let worker_count = worker_count.max(1).min(items.len());
    let next_item = AtomicUsize::new(0);
    let (sender, receiver) = mpsc::channel::<(usize, T)>();

    thread::scope(|scope| {
        for _ in 0..worker_count {
            let sender = sender.clone();
            let next_item = &next_item;
            let work = &work;

            scope.spawn(move || {
                loop {
                    let index = next_item.fetch_add(1, Ordering::SeqCst);
                    let Some(item) = items.get(index) else {
                        break;
                    };
                    if sender.send((index, work(item))).is_err() {
                        break;
                    }
                }
            });
        }
    });
    drop(sender);

    let mut slots: Vec<Option<T>> = (0..items.len()).map(|_| None).collect();
    for (index, outcome) in receiver {
        slots[index] = Some(outcome);
    }

    slots.into_iter().flatten().collect()
}
