//! File-level operations: PDF to text file, and text file to JSON.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::parser::{ExtractOptions, PdfExtractor};

#[cfg(feature = "llm")]
use crate::llm::GroqClient;

/// `<stem>.txt` next to the PDF.
pub fn default_text_path(pdf_path: &Path) -> PathBuf {
    pdf_path.with_extension("txt")
}

/// `<stem>_temp.txt` next to the PDF, the intermediate file of the JSON conversion.
pub fn temp_text_path(pdf_path: &Path) -> PathBuf {
    let stem = pdf_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    pdf_path.with_file_name(format!("{}_temp.txt", stem))
}

/// `<stem>.json` next to the PDF.
pub fn default_json_path(pdf_path: &Path) -> PathBuf {
    pdf_path.with_extension("json")
}

/// Extract a PDF's reconstructed text and write it to a file.
///
/// Writes to `output`, or to [`default_text_path`] when `None`, and returns
/// the path written.
pub fn write_text_file(
    pdf_path: &Path,
    output: Option<&Path>,
    options: ExtractOptions,
) -> Result<PathBuf> {
    let output = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| default_text_path(pdf_path));

    log::info!("Converting PDF: {}", pdf_path.display());
    let document = PdfExtractor::open_with_options(pdf_path, options)?.extract_document()?;
    fs::write(&output, document.text())?;
    log::info!("Text written to {}", output.display());

    Ok(output)
}

/// Outcome of a PDF-to-JSON conversion.
#[derive(Debug, Clone)]
pub struct JsonConversion {
    /// Where the JSON answer was written
    pub json_path: PathBuf,
    /// Intermediate text file, if it was kept
    pub text_path: Option<PathBuf>,
    /// The model's complete answer
    pub content: String,
}

/// Stream the model's JSON rendition of `text` into `json_path`.
///
/// Every chunk goes to the file and to `echo` as it arrives.
#[cfg(feature = "llm")]
pub fn text_to_json_file<W: Write>(
    text: &str,
    json_path: &Path,
    client: &GroqClient,
    echo: &mut W,
) -> Result<String> {
    log::info!("Saving JSON output to {}", json_path.display());
    let file = fs::File::create(json_path)?;
    let mut tee = Tee {
        file: std::io::BufWriter::new(file),
        echo,
    };
    let content = client.stream_completion(text, &mut tee)?;
    tee.flush()?;
    Ok(content)
}

/// Convert a PDF to JSON via its reconstructed text.
///
/// The text is written to [`temp_text_path`], read back and sent to the
/// model; the answer is streamed into `json_path`. The intermediate file is
/// removed unless `keep_text_file` is set.
#[cfg(feature = "llm")]
pub fn convert_pdf_to_json<W: Write>(
    pdf_path: &Path,
    json_path: &Path,
    keep_text_file: bool,
    client: &GroqClient,
    options: ExtractOptions,
    echo: &mut W,
) -> Result<JsonConversion> {
    let text_path = write_text_file(pdf_path, Some(&temp_text_path(pdf_path)), options)?;
    let text = fs::read_to_string(&text_path)?;

    let content = text_to_json_file(&text, json_path, client, echo)?;

    let text_path = if keep_text_file {
        Some(text_path)
    } else {
        fs::remove_file(&text_path)?;
        log::info!("Temporary text file removed");
        None
    };

    Ok(JsonConversion {
        json_path: json_path.to_path_buf(),
        text_path,
        content,
    })
}

/// Writes to a file and mirrors everything to a second writer.
struct Tee<'a, F: Write, W: Write> {
    file: F,
    echo: &'a mut W,
}

impl<F: Write, W: Write> Write for Tee<'_, F, W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.file.write_all(buf)?;
        self.echo.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.file.flush()?;
        self.echo.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_paths() {
        let pdf = Path::new("statements/bankstatement.pdf");
        assert_eq!(
            default_text_path(pdf),
            PathBuf::from("statements/bankstatement.txt")
        );
        assert_eq!(
            temp_text_path(pdf),
            PathBuf::from("statements/bankstatement_temp.txt")
        );
        assert_eq!(
            default_json_path(pdf),
            PathBuf::from("statements/bankstatement.json")
        );
    }

    #[test]
    fn test_tee_mirrors_writes() {
        let mut echo = Vec::new();
        let mut tee = Tee {
            file: Vec::new(),
            echo: &mut echo,
        };
        tee.write_all(b"{\"a\":").unwrap();
        tee.write_all(b" 1}").unwrap();
        tee.flush().unwrap();
        let file = std::mem::take(&mut tee.file);

        assert_eq!(file, b"{\"a\": 1}");
        assert_eq!(echo, b"{\"a\": 1}");
    }

    #[test]
    fn test_write_text_file_rejects_non_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let fake = dir.path().join("notes.pdf");
        fs::write(&fake, "just some text, long enough to sniff").unwrap();

        let result = write_text_file(&fake, None, ExtractOptions::default());
        assert!(matches!(result, Err(crate::Error::UnknownFormat)));
        assert!(!default_text_path(&fake).exists());
    }

    /// One-page statement: `Date:` is drawn first, the amount sits 0.3 above its label.
    fn write_statement_pdf(dir: &Path) -> PathBuf {
        use lopdf::{dictionary, Document as LopdfDocument, Object, Stream};

        let content = "BT 1 0 0 1 72 480 Tm (Date:) Tj ET \
                       BT 1 0 0 1 72 500 Tm (Total:) Tj ET \
                       BT 1 0 0 1 160 500.3 Tm ($42.00) Tj ET";

        let mut doc = LopdfDocument::with_version("1.4");
        let pages_id = doc.new_object_id();
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.as_bytes().to_vec()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![Object::Reference(page_id)],
                "Count" => 1_i64,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let path = dir.join("statement.pdf");
        doc.save(&path).unwrap();
        path
    }

    #[test]
    fn test_write_text_file_reads_statement() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = write_statement_pdf(dir.path());

        let written = write_text_file(&pdf, None, ExtractOptions::default()).unwrap();
        assert_eq!(written, dir.path().join("statement.txt"));
        assert_eq!(fs::read_to_string(written).unwrap(), "Total: $42.00\nDate:");
    }

    #[cfg(feature = "llm")]
    mod llm_pipeline {
        use super::*;
        use crate::llm::LlmConfig;
        use std::io::{BufRead, BufReader, Read, Write};
        use std::net::TcpListener;
        use std::thread;

        const SSE_BODY: &str = concat!(
            r#"data: {"choices":[{"delta":{"role":"assistant"}}]}"#,
            "\n\n",
            r#"data: {"choices":[{"delta":{"content":"{\"total\": "}}]}"#,
            "\n\n",
            r#"data: {"choices":[{"delta":{"content":"\"$42.00\"}"}}]}"#,
            "\n\n",
            "data: [DONE]\n\n",
        );

        /// Answer a single HTTP request with `status` and `body`; the thread
        /// returns the request it received.
        fn serve_once(
            status: &'static str,
            body: &'static str,
        ) -> (String, thread::JoinHandle<String>) {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            let base_url = format!("http://{}/v1", listener.local_addr().unwrap());

            let handle = thread::spawn(move || {
                let (mut stream, _) = listener.accept().unwrap();
                let mut reader = BufReader::new(stream.try_clone().unwrap());

                let mut request = String::new();
                let mut content_length = 0;
                loop {
                    let mut line = String::new();
                    reader.read_line(&mut line).unwrap();
                    if line == "\r\n" || line.is_empty() {
                        break;
                    }
                    if let Some((name, value)) = line.split_once(':') {
                        if name.eq_ignore_ascii_case("content-length") {
                            content_length = value.trim().parse().unwrap();
                        }
                    }
                    request.push_str(&line);
                }
                let mut payload = vec![0; content_length];
                reader.read_exact(&mut payload).unwrap();
                request.push_str(&String::from_utf8(payload).unwrap());

                write!(
                    stream,
                    "HTTP/1.1 {}\r\nContent-Type: text/event-stream\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                )
                .unwrap();
                stream.flush().unwrap();
                request
            });

            (base_url, handle)
        }

        fn client_for(base_url: &str) -> GroqClient {
            GroqClient::new(LlmConfig::new("gsk_test").with_base_url(base_url)).unwrap()
        }

        #[test]
        fn test_convert_streams_answer_and_removes_temp_text() {
            let dir = tempfile::tempdir().unwrap();
            let pdf = write_statement_pdf(dir.path());
            let json_path = dir.path().join("statement.json");
            let (base_url, server) = serve_once("200 OK", SSE_BODY);

            let mut echo = Vec::new();
            let conversion = convert_pdf_to_json(
                &pdf,
                &json_path,
                false,
                &client_for(&base_url),
                ExtractOptions::default(),
                &mut echo,
            )
            .unwrap();

            let request = server.join().unwrap();
            assert!(request.starts_with("POST /v1/chat/completions "));
            assert!(request.to_ascii_lowercase().contains("authorization: bearer gsk_test"));
            assert!(request.contains(r#""content":"Total: $42.00\nDate:""#));
            assert!(request.contains(r#""stream":true"#));

            let expected = r#"{"total": "$42.00"}"#;
            assert_eq!(conversion.content, expected);
            assert_eq!(fs::read_to_string(&json_path).unwrap(), expected);
            assert_eq!(String::from_utf8(echo).unwrap(), expected);

            assert_eq!(conversion.json_path, json_path);
            assert_eq!(conversion.text_path, None);
            assert!(!temp_text_path(&pdf).exists());
        }

        #[test]
        fn test_convert_keeps_temp_text_when_asked() {
            let dir = tempfile::tempdir().unwrap();
            let pdf = write_statement_pdf(dir.path());
            let json_path = dir.path().join("out.json");
            let (base_url, server) = serve_once("200 OK", SSE_BODY);

            let conversion = convert_pdf_to_json(
                &pdf,
                &json_path,
                true,
                &client_for(&base_url),
                ExtractOptions::default(),
                &mut std::io::sink(),
            )
            .unwrap();
            server.join().unwrap();

            let kept = dir.path().join("statement_temp.txt");
            assert_eq!(conversion.text_path.as_deref(), Some(kept.as_path()));
            assert_eq!(fs::read_to_string(&kept).unwrap(), "Total: $42.00\nDate:");
            assert_eq!(fs::read_to_string(&json_path).unwrap(), r#"{"total": "$42.00"}"#);
        }

        #[test]
        fn test_convert_reports_http_error_status_and_body() {
            let dir = tempfile::tempdir().unwrap();
            let pdf = write_statement_pdf(dir.path());
            let (base_url, server) =
                serve_once("500 Internal Server Error", r#"{"error":"model overloaded"}"#);

            let result = convert_pdf_to_json(
                &pdf,
                &dir.path().join("statement.json"),
                false,
                &client_for(&base_url),
                ExtractOptions::default(),
                &mut std::io::sink(),
            );
            server.join().unwrap();

            match result {
                Err(crate::Error::Llm(msg)) => {
                    assert!(msg.contains("500"), "{}", msg);
                    assert!(msg.contains("model overloaded"), "{}", msg);
                }
                other => panic!("expected Llm error, got {:?}", other),
            }
        }
    }
}
