#![forbid(unsafe_code)]

use std::io::{self, Read};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, Receiver};
use tracing::debug;

use crate::error::{GzipError, Result};
use crate::producer::{Produce, Producer};

////////////////////////////////////////////////////////////////////////////////

/// The producer, either called in place or running on its own thread.
/// Both variants yield the same event sequence.
pub enum Pipeline<T> {
    Inline(Producer<T>),
    Threaded(ProducerThread),
}

impl<T: Read> Pipeline<T> {
    pub fn inline(producer: Producer<T>) -> Self {
        Pipeline::Inline(producer)
    }

    pub fn next_produce(&mut self) -> Result<Option<Produce>> {
        match self {
            Pipeline::Inline(producer) => producer.next_produce(),
            Pipeline::Threaded(thread) => thread.recv(),
        }
    }
}

impl<T: Read + Send + 'static> Pipeline<T> {
    /// Moves `producer` onto a new thread that runs ahead of the caller by at
    /// most `capacity` events.
    pub fn spawn(producer: Producer<T>, capacity: usize) -> Result<Self> {
        Ok(Pipeline::Threaded(ProducerThread::spawn(producer, capacity)?))
    }
}

impl<T: Read> Iterator for Pipeline<T> {
    type Item = Result<Produce>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_produce().transpose()
    }
}

////////////////////////////////////////////////////////////////////////////////

/// Consumer end of a background producer. A failure is sent as the last
/// item; a closed channel without one means the sequence ended.
pub struct ProducerThread {
    receiver: Option<Receiver<Result<Produce>>>,
    handle: Option<JoinHandle<()>>,
}

impl ProducerThread {
    fn spawn<T: Read + Send + 'static>(producer: Producer<T>, capacity: usize) -> Result<Self> {
        let (sender, receiver) = bounded(capacity.max(1));

        let handle = thread::Builder::new()
            .name("gunzip-producer".into())
            .spawn(move || {
                for item in producer {
                    let failed = item.is_err();
                    if sender.send(item).is_err() {
                        debug!("consumer hung up, stopping producer");
                        return;
                    }
                    if failed {
                        debug!("producer failed, closing channel");
                        return;
                    }
                }
                debug!("producer finished");
            })?;

        Ok(Self {
            receiver: Some(receiver),
            handle: Some(handle),
        })
    }

    fn recv(&mut self) -> Result<Option<Produce>> {
        let Some(receiver) = &self.receiver else {
            return Ok(None);
        };

        match receiver.recv() {
            Ok(item) => item.map(Some),
            Err(_) => {
                self.receiver = None;
                self.join()?;
                Ok(None)
            }
        }
    }

    fn join(&mut self) -> Result<()> {
        match self.handle.take() {
            Some(handle) => handle.join().map_err(|_| {
                GzipError::Io(io::Error::new(
                    io::ErrorKind::Other,
                    "producer thread panicked",
                ))
            }),
            None => Ok(()),
        }
    }
}

impl Drop for ProducerThread {
    fn drop(&mut self) {
        // Unblocks a producer stuck on a full channel before joining it.
        self.receiver = None;
        let _ = self.join();
    }
}

////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::config::DecompressOptions;
    use crate::test_utils::{gzip_member, long_run_block, six_a_block};

    fn kinds(pipeline: Pipeline<Cursor<Vec<u8>>>) -> Vec<String> {
        pipeline
            .map(|item| match item {
                Ok(Produce::Header(_)) => "header".to_string(),
                Ok(Produce::Data(data)) => format!("data:{}", data.len()),
                Ok(Produce::Footer(_)) => "footer".to_string(),
                Err(err) => format!("error:{}", err),
            })
            .collect()
    }

    fn both_modes(data: Vec<u8>, capacity: usize) -> Result<(Vec<String>, Vec<String>)> {
        let options = DecompressOptions::default();
        let inline = Pipeline::inline(Producer::new(Cursor::new(data.clone()), &options));
        let threaded = Pipeline::spawn(Producer::new(Cursor::new(data), &options), capacity)?;
        Ok((kinds(inline), kinds(threaded)))
    }

    #[test]
    fn same_events_in_both_modes() -> Result<()> {
        let mut data = gzip_member(&six_a_block(), b"AAAAAA");
        let long = vec![b'A'; 1 + 258 * 500];
        data.extend(gzip_member(&long_run_block(500), &long));

        let (inline, threaded) = both_modes(data, 1)?;
        assert_eq!(inline, threaded);
        assert_eq!(inline.first().map(String::as_str), Some("header"));
        assert_eq!(inline.last().map(String::as_str), Some("footer"));
        Ok(())
    }

    #[test]
    fn error_crosses_thread() -> Result<()> {
        let mut data = gzip_member(&six_a_block(), b"AAAAAA");
        data.extend_from_slice(&[0x1f, 0x8b, 7, 0, 0, 0, 0, 0, 0, 0]);

        let (inline, threaded) = both_modes(data, 4)?;
        assert_eq!(inline, threaded);
        assert_eq!(
            threaded.last().map(String::as_str),
            Some("error:invalid gzip header")
        );
        Ok(())
    }

    #[test]
    fn empty_input_crosses_thread() -> Result<()> {
        let (inline, threaded) = both_modes(Vec::new(), 2)?;
        assert_eq!(inline, threaded);
        assert_eq!(threaded, vec!["error:input contains no gzip member".to_string()]);
        Ok(())
    }

    #[test]
    fn dropping_early_joins_producer() -> Result<()> {
        let long = vec![b'A'; 1 + 258 * 2000];
        let data = gzip_member(&long_run_block(2000), &long);
        let options = DecompressOptions::default();

        let mut pipeline = Pipeline::spawn(Producer::new(Cursor::new(data), &options), 1)?;
        assert!(matches!(pipeline.next_produce()?, Some(Produce::Header(_))));
        drop(pipeline);
        Ok(())
    }
}
