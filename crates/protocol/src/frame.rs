/// One discrete unit delivered by the room connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// UTF-8 control message.
    Text(String),
    /// Raw chunk payload; always follows a `file_chunk` text frame.
    Binary(Vec<u8>),
}
