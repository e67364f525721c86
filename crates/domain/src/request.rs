use crate::bitmap::Bitmap;
use crate::error::{PrintError, Result};
use crate::format::TextFormat;

/// One call a caller can ask the printer service to perform.
///
/// Requests are validated before they are queued so that a malformed
/// call never consumes a slot on the worker.
#[derive(Debug, Clone, PartialEq)]
pub enum PrintRequest {
    GetVersion,
    GetServiceVersion,
    GetPrinterModel,
    GetPrinterStatus,
    PrintText { text: String, format: TextFormat },
    PrintBarcode { text: String, width: i32, height: i32 },
    PrintQrCode { text: String, width: i32, height: i32 },
    PrintBitmap { bitmap: Bitmap },
    CheckPaper,
    FeedPaper { pixels: i32 },
}

impl PrintRequest {
    /// Operation name used in logs and call frames.
    pub fn op_name(&self) -> &'static str {
        match self {
            Self::GetVersion => "getVersion",
            Self::GetServiceVersion => "getServiceVersion",
            Self::GetPrinterModel => "getPrinterModel",
            Self::GetPrinterStatus => "getPrinterStatus",
            Self::PrintText { .. } => "printText",
            Self::PrintBarcode { .. } => "printBarcode",
            Self::PrintQrCode { .. } => "printQrCode",
            Self::PrintBitmap { .. } => "printBitmap",
            Self::CheckPaper => "checkPaper",
            Self::FeedPaper { .. } => "feedPaper",
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            Self::GetVersion
            | Self::GetServiceVersion
            | Self::GetPrinterModel
            | Self::GetPrinterStatus
            | Self::CheckPaper => Ok(()),
            Self::PrintText { text, format } => {
                if text.is_empty() {
                    return Err(PrintError::invalid_argument("text", "must not be empty"));
                }
                format.validate()
            }
            Self::PrintBarcode {
                text,
                width,
                height,
            }
            | Self::PrintQrCode {
                text,
                width,
                height,
            } => {
                if text.is_empty() {
                    return Err(PrintError::invalid_argument("text", "must not be empty"));
                }
                if *width <= 0 {
                    return Err(PrintError::invalid_argument("width", "must be positive"));
                }
                if *height <= 0 {
                    return Err(PrintError::invalid_argument("height", "must be positive"));
                }
                Ok(())
            }
            // Bitmap dimensions were already checked on construction
            Self::PrintBitmap { .. } => Ok(()),
            Self::FeedPaper { pixels } => {
                if *pixels < 0 {
                    return Err(PrintError::invalid_argument(
                        "pixels",
                        "must not be negative",
                    ));
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_requests_always_valid() {
        assert!(PrintRequest::GetVersion.validate().is_ok());
        assert!(PrintRequest::GetPrinterStatus.validate().is_ok());
        assert!(PrintRequest::CheckPaper.validate().is_ok());
    }

    #[test]
    fn test_print_text_rejects_empty_text() {
        let request = PrintRequest::PrintText {
            text: String::new(),
            format: TextFormat::default(),
        };
        let err = request.validate().unwrap_err();
        assert!(matches!(
            err,
            PrintError::InvalidArgument { field: "text", .. }
        ));
    }

    #[test]
    fn test_print_text_rejects_invalid_format() {
        let request = PrintRequest::PrintText {
            text: "TOTAL  12.50".to_string(),
            format: TextFormat::new().with_text_size(-1),
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_barcode_rejects_bad_dimensions() {
        let request = PrintRequest::PrintBarcode {
            text: "4006381333931".to_string(),
            width: 0,
            height: 160,
        };
        let err = request.validate().unwrap_err();
        assert!(matches!(
            err,
            PrintError::InvalidArgument { field: "width", .. }
        ));

        let request = PrintRequest::PrintQrCode {
            text: "https://example.com/r/42".to_string(),
            width: 300,
            height: -10,
        };
        let err = request.validate().unwrap_err();
        assert!(matches!(
            err,
            PrintError::InvalidArgument {
                field: "height",
                ..
            }
        ));
    }

    #[test]
    fn test_feed_paper_rejects_negative_pixels() {
        let request = PrintRequest::FeedPaper { pixels: -8 };
        assert!(request.validate().is_err());
        assert!(PrintRequest::FeedPaper { pixels: 0 }.validate().is_ok());
    }

    #[test]
    fn test_op_names() {
        assert_eq!(PrintRequest::GetVersion.op_name(), "getVersion");
        assert_eq!(
            PrintRequest::FeedPaper { pixels: 24 }.op_name(),
            "feedPaper"
        );
    }
}
