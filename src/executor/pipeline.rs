use super::process::{spawn, ChildIo, ChildSet, Prepared};
use super::{open_output, ExecError};
use std::io::Read;
use std::os::fd::{AsRawFd, RawFd};
use std::path::Path;

/// Run `producer | consumer` and collect everything the consumer writes.
///
/// Returns the captured bytes and the consumer's exit code. The buffer starts
/// at `initial` bytes and grows as needed.
pub fn capture(
    producer: &Prepared,
    consumer: &Prepared,
    initial: usize,
) -> Result<(Vec<u8>, i32), ExecError> {
    let mut children = ChildSet::new();
    let (mut out_reader, out_writer) = os_pipe::pipe().map_err(ExecError::Pipe)?;
    spawn_pair(producer, consumer, out_writer.as_raw_fd(), &mut children)?;
    // Our write end must be gone or the read below never sees end-of-stream.
    drop(out_writer);

    let mut output = Vec::with_capacity(initial);
    out_reader
        .read_to_end(&mut output)
        .map_err(ExecError::ReadOutput)?;
    drop(out_reader);

    let code = children.wait_all()?;
    tracing::debug!(bytes = output.len(), code, "pipeline captured");
    Ok((output, code))
}

/// Run `producer | consumer > path`. Nothing passes through the engine.
pub fn to_file(producer: &Prepared, consumer: &Prepared, path: &Path) -> Result<i32, ExecError> {
    let mut children = ChildSet::new();
    let file = open_output(path)?;
    spawn_pair(producer, consumer, file.as_raw_fd(), &mut children)?;
    drop(file);
    children.wait_all()
}

/// Launch both sides, the producer's stdout feeding the consumer's stdin and
/// the consumer's stdout going to `consumer_out`. Both ends of the connecting
/// pipe are closed in the parent before this returns.
fn spawn_pair(
    producer: &Prepared,
    consumer: &Prepared,
    consumer_out: RawFd,
    children: &mut ChildSet,
) -> Result<(), ExecError> {
    let (reader, writer) = os_pipe::pipe().map_err(ExecError::Pipe)?;

    children.push(spawn(producer, ChildIo::stdout_to(writer.as_raw_fd()))?);
    children.push(spawn(
        consumer,
        ChildIo {
            stdin: Some(reader.as_raw_fd()),
            stdout: Some(consumer_out),
        },
    )?);

    drop(writer);
    drop(reader);
    Ok(())
}
