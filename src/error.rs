use std::fmt;

#[derive(Debug)]
pub enum SvgError {
    Io(std::io::Error),
    Xml(roxmltree::Error),
    // Parsed fine but there is no <svg> root element.
    NoRoot,
}

impl fmt::Display for SvgError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SvgError::Io(err) => write!(f, "io error: {}", err),
            SvgError::Xml(err) => write!(f, "xml error: {}", err),
            SvgError::NoRoot => write!(f, "document has no <svg> root element"),
        }
    }
}

impl std::error::Error for SvgError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SvgError::Io(err) => Some(err),
            SvgError::Xml(err) => Some(err),
            SvgError::NoRoot => None,
        }
    }
}

impl From<std::io::Error> for SvgError {
    fn from(value: std::io::Error) -> Self {
        SvgError::Io(value)
    }
}

impl From<roxmltree::Error> for SvgError {
    fn from(value: roxmltree::Error) -> Self {
        SvgError::Xml(value)
    }
}
