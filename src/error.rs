pub type Result<T> = std::result::Result<T, DiagramError>;

#[derive(Debug, thiserror::Error)]
pub enum DiagramError {
    #[error("edge {index} references unknown node `{id}`")]
    UnknownNode { index: usize, id: String },

    #[error("edge {index} connects node `{id}` to itself")]
    SelfLoop { index: usize, id: String },

    #[error("no usable font face for family `{family}`")]
    Font { family: String },
}
