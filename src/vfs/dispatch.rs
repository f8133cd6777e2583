/*!
 * Method Dispatch
 * Name-based forwarding of filesystem calls through the manager
 */

use std::vec::IntoIter;

use tracing::debug;

use super::filesystem::Drained;
use super::mount::Manager;
use super::types::*;

/// Method names accepted by [`Manager::call`]
pub const CALLABLE_METHODS: &[&str] = &[
    "exists",
    "read",
    "read_stream",
    "read_and_delete",
    "list_contents",
    "write",
    "write_stream",
    "update",
    "update_stream",
    "put",
    "put_stream",
    "rename",
    "copy",
    "move",
    "delete",
    "create_dir",
    "delete_dir",
    "get_mime_type",
    "get_metadata",
    "get_visibility",
    "set_visibility",
];

/// One positional argument of a dispatched call
#[derive(Debug)]
pub enum CallArg {
    Str(String),
    Bytes(Vec<u8>),
    Stream(Stream),
    Config(FsConfig),
    Bool(bool),
}

impl CallArg {
    fn kind(&self) -> &'static str {
        match self {
            CallArg::Str(_) => "string",
            CallArg::Bytes(_) => "bytes",
            CallArg::Stream(_) => "stream",
            CallArg::Config(_) => "config",
            CallArg::Bool(_) => "bool",
        }
    }
}

impl From<&str> for CallArg {
    fn from(value: &str) -> Self {
        CallArg::Str(value.to_string())
    }
}

impl From<String> for CallArg {
    fn from(value: String) -> Self {
        CallArg::Str(value)
    }
}

impl From<Vec<u8>> for CallArg {
    fn from(value: Vec<u8>) -> Self {
        CallArg::Bytes(value)
    }
}

impl From<&[u8]> for CallArg {
    fn from(value: &[u8]) -> Self {
        CallArg::Bytes(value.to_vec())
    }
}

impl From<Stream> for CallArg {
    fn from(value: Stream) -> Self {
        CallArg::Stream(value)
    }
}

impl From<FsConfig> for CallArg {
    fn from(value: FsConfig) -> Self {
        CallArg::Config(value)
    }
}

impl From<bool> for CallArg {
    fn from(value: bool) -> Self {
        CallArg::Bool(value)
    }
}

/// Result of a dispatched call, one variant per return shape
#[derive(Debug)]
pub enum CallOutput {
    Bool(bool),
    Bytes(Vec<u8>),
    Stream(Stream),
    Listing(Vec<FileMetadata>),
    Metadata(Option<FileMetadata>),
    Text(String),
    Visibility(Visibility),
    Drained(Drained),
}

impl CallOutput {
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            CallOutput::Bool(value) => Some(*value),
            _ => None,
        }
    }

    #[must_use]
    pub fn into_bytes(self) -> Option<Vec<u8>> {
        match self {
            CallOutput::Bytes(bytes) => Some(bytes),
            CallOutput::Drained(drained) => Some(drained.contents),
            _ => None,
        }
    }
}

/// Remaining arguments after the leading URI
struct Args<'m> {
    method: &'m str,
    items: IntoIter<CallArg>,
    position: usize,
}

impl<'m> Args<'m> {
    fn next(&mut self) -> Option<CallArg> {
        self.position += 1;
        self.items.next()
    }

    fn missing(&self) -> VfsError {
        VfsError::MethodArgumentsUndefined {
            method: self.method.to_string(),
        }
    }

    fn mismatch(&self, expected: &str) -> VfsError {
        VfsError::ArgumentTypeError {
            method: self.method.to_string(),
            position: self.position,
            expected: expected.to_string(),
        }
    }

    fn string(&mut self) -> VfsResult<String> {
        match self.next() {
            Some(CallArg::Str(value)) => Ok(value),
            Some(_) => Err(self.mismatch("string")),
            None => Err(self.missing()),
        }
    }

    /// File contents, given as bytes or text
    fn contents(&mut self) -> VfsResult<Vec<u8>> {
        match self.next() {
            Some(CallArg::Bytes(bytes)) => Ok(bytes),
            Some(CallArg::Str(text)) => Ok(text.into_bytes()),
            Some(_) => Err(self.mismatch("bytes")),
            None => Err(self.missing()),
        }
    }

    fn stream(&mut self) -> VfsResult<Stream> {
        match self.next() {
            Some(CallArg::Stream(stream)) => Ok(stream),
            Some(other) => {
                debug!(method = self.method, got = other.kind(), "stream argument expected");
                Err(VfsError::RewindResourceTypeError)
            }
            None => Err(self.missing()),
        }
    }

    fn config(&mut self) -> VfsResult<FsConfig> {
        match self.next() {
            Some(CallArg::Config(config)) => Ok(config),
            Some(_) => Err(self.mismatch("config")),
            None => Ok(FsConfig::default()),
        }
    }

    fn flag(&mut self) -> VfsResult<bool> {
        match self.next() {
            Some(CallArg::Bool(value)) => Ok(value),
            Some(_) => Err(self.mismatch("bool")),
            None => Ok(false),
        }
    }

    fn visibility(&mut self) -> VfsResult<Visibility> {
        self.string()?.parse()
    }
}

impl Manager {
    /// Forward a call by method name
    ///
    /// The first argument is a `prefix://path` URI; the prefix selects the
    /// filesystem and the remaining arguments are passed on in order.
    /// Optional trailing arguments (config, the recursive flag) may be left out.
    pub fn call(&self, method: &str, args: Vec<CallArg>) -> VfsResult<CallOutput> {
        let mut items = args.into_iter();

        let uri = match items.next() {
            None => {
                return Err(VfsError::MethodArgumentsUndefined {
                    method: method.to_string(),
                })
            }
            Some(CallArg::Str(uri)) if !uri.is_empty() => uri,
            Some(_) => return Err(VfsError::PathTypeError),
        };

        let (prefix, _) = Manager::get_prefix_and_path(&uri)?;
        self.get_filesystem(prefix)?;

        let mut args = Args {
            method,
            items,
            position: 0,
        };
        let uri = uri.as_str();

        let output = match method {
            "exists" => CallOutput::Bool(self.exists(uri)?),
            "read" => CallOutput::Bytes(self.read(uri)?),
            "read_stream" => CallOutput::Stream(self.read_stream(uri)?),
            "read_and_delete" => CallOutput::Drained(self.read_and_delete(uri)?),
            "list_contents" => CallOutput::Listing(self.list_contents(uri, args.flag()?)?),
            "write" => {
                let contents = args.contents()?;
                CallOutput::Bool(self.write(uri, &contents, &args.config()?)?)
            }
            "write_stream" => {
                let mut stream = args.stream()?;
                CallOutput::Bool(self.write_stream(uri, &mut stream, &args.config()?)?)
            }
            "update" => {
                let contents = args.contents()?;
                CallOutput::Bool(self.update(uri, &contents, &args.config()?)?)
            }
            "update_stream" => {
                let mut stream = args.stream()?;
                CallOutput::Bool(self.update_stream(uri, &mut stream, &args.config()?)?)
            }
            "put" => {
                let contents = args.contents()?;
                CallOutput::Bool(self.put(uri, &contents, &args.config()?)?)
            }
            "put_stream" => {
                let mut stream = args.stream()?;
                CallOutput::Bool(self.put_stream(uri, &mut stream, &args.config()?)?)
            }
            "rename" => CallOutput::Bool(self.rename(uri, &args.string()?)?),
            "copy" => {
                let to = args.string()?;
                CallOutput::Bool(self.copy(uri, &to, &args.config()?)?)
            }
            "move" => {
                let to = args.string()?;
                CallOutput::Bool(self.move_file(uri, &to, &args.config()?)?)
            }
            "delete" => CallOutput::Bool(self.delete(uri)?),
            "create_dir" => CallOutput::Bool(self.create_dir(uri, &args.config()?)?),
            "delete_dir" => CallOutput::Bool(self.delete_dir(uri)?),
            "get_mime_type" => CallOutput::Text(self.get_mime_type(uri)?),
            "get_metadata" => CallOutput::Metadata(self.get_metadata(uri)?),
            "get_visibility" => CallOutput::Visibility(self.get_visibility(uri)?),
            "set_visibility" => CallOutput::Bool(self.set_visibility(uri, args.visibility()?)?),
            _ => {
                return Err(VfsError::BadMethodCall {
                    prefix: prefix.to_string(),
                    method: method.to_string(),
                })
            }
        };

        Ok(output)
    }
}
