use std::collections::HashMap;

use log::debug;
use operon_core::annotation::CdsCoordinate;
use operon_core::lookup::Lookup;
use operon_core::provider::{GenomicProvider, ProviderError};
use operon_formats::{detect, fasta, ipg, ParseError, ResponseFormat};
use reqwest::blocking::Client;
use reqwest::Url;

use crate::config::NcbiConfig;

/// [`GenomicProvider`] backed by NCBI `efetch`.
///
/// Every trait method issues exactly one HTTP request. Request spacing and
/// retries are left to the caller.
#[derive(Debug, Clone)]
pub struct NcbiClient {
    http: Client,
    config: NcbiConfig,
}

impl NcbiClient {
    pub fn new(config: NcbiConfig) -> Result<Self, ProviderError> {
        let http = Client::builder()
            .timeout(config.timeout)
            .user_agent(format!(
                "{}/{}",
                env!("CARGO_PKG_NAME"),
                env!("CARGO_PKG_VERSION")
            ))
            .build()
            .map_err(|e| ProviderError::Network(e.to_string()))?;
        Ok(Self { http, config })
    }

    pub fn from_env() -> Result<Self, ProviderError> {
        Self::new(NcbiConfig::from_env())
    }

    pub fn config(&self) -> &NcbiConfig {
        &self.config
    }

    /// Identical-protein report for one or more protein accessions.
    pub fn ipg_url(&self, accessions: &[String]) -> Result<Url, ProviderError> {
        self.efetch_url(&[
            ("db", "protein".to_string()),
            ("rettype", "ipg".to_string()),
            ("id", accessions.join(",")),
        ])
    }

    /// Translated CDS records of a nucleotide window; one FASTA header per gene.
    pub fn window_url(&self, genome_id: &str, start: u64, stop: u64) -> Result<Url, ProviderError> {
        self.efetch_url(&[
            ("db", "nuccore".to_string()),
            ("rettype", "fasta_cds_aa".to_string()),
            ("id", genome_id.to_string()),
            ("seq_start", start.to_string()),
            ("seq_stop", stop.to_string()),
        ])
    }

    /// Forward-strand nucleotides of a window.
    pub fn sequence_url(
        &self,
        genome_id: &str,
        start: u64,
        stop: u64,
    ) -> Result<Url, ProviderError> {
        self.efetch_url(&[
            ("db", "nuccore".to_string()),
            ("rettype", "fasta".to_string()),
            ("strand", "1".to_string()),
            ("id", genome_id.to_string()),
            ("seq_start", start.to_string()),
            ("seq_stop", stop.to_string()),
        ])
    }

    fn efetch_url(&self, params: &[(&str, String)]) -> Result<Url, ProviderError> {
        let mut query = params.to_vec();
        if let Some(key) = &self.config.api_key {
            query.push(("api_key", key.clone()));
        }
        if let Some(tool) = &self.config.tool {
            query.push(("tool", tool.clone()));
        }
        if let Some(email) = &self.config.email {
            query.push(("email", email.clone()));
        }

        let endpoint = format!("{}/efetch.fcgi", self.config.base_url.trim_end_matches('/'));
        Url::parse_with_params(&endpoint, &query)
            .map_err(|e| ProviderError::Malformed(format!("invalid request URL {endpoint}: {e}")))
    }

    /// One GET. Transient failures are returned as is; the caller decides
    /// whether to retry.
    fn fetch(&self, url: &Url) -> Result<String, ProviderError> {
        debug!("GET {url}");
        let response = self
            .http
            .get(url.clone())
            .send()
            .map_err(|e| request_error(url, e))?;
        let status = response.status().as_u16();
        let body = response.text().map_err(|e| request_error(url, e))?;
        interpret_response(url.as_str(), status, body)
    }
}

fn request_error(url: &Url, error: reqwest::Error) -> ProviderError {
    if error.is_timeout() {
        ProviderError::Timeout {
            url: url.to_string(),
        }
    } else {
        ProviderError::Network(error.to_string())
    }
}

/// Turn a status code and body into the payload or a [`ProviderError`].
///
/// efetch reports some failures with HTTP 200 and an error text; those are
/// failures too.
pub fn interpret_response(url: &str, status: u16, body: String) -> Result<String, ProviderError> {
    if !(200..300).contains(&status) {
        return Err(ProviderError::Http {
            status,
            url: url.to_string(),
        });
    }
    if let Some(message) = detect::error_message(&body) {
        return Err(ProviderError::Upstream(message));
    }
    Ok(body)
}

fn malformed(what: &str, error: ParseError) -> ProviderError {
    ProviderError::Malformed(format!("{what}: {error}"))
}

impl GenomicProvider for NcbiClient {
    fn batch_coordinates(
        &self,
        accessions: &[String],
    ) -> Result<HashMap<String, Lookup<CdsCoordinate>>, ProviderError> {
        if accessions.is_empty() {
            return Ok(HashMap::new());
        }

        let body = self.fetch(&self.ipg_url(accessions)?)?;
        let reports = ipg::parse_ipg_report(&body).map_err(|e| malformed("IPG batch", e))?;

        let mut resolved = HashMap::new();
        for report in reports {
            match report.product_accession {
                Some(accession) => {
                    resolved.entry(accession).or_insert(report.cds);
                }
                None => debug!("Skipping IPG report without product accession"),
            }
        }
        Ok(resolved)
    }

    fn coordinate(&self, accession: &str) -> Result<Lookup<CdsCoordinate>, ProviderError> {
        let body = self.fetch(&self.ipg_url(&[accession.to_string()])?)?;
        let reports = match ipg::parse_ipg_report(&body) {
            Ok(reports) => reports,
            Err(ParseError::MissingField(_)) => return Ok(Lookup::Absent),
            Err(e) => return Err(malformed("IPG report", e)),
        };

        let report = reports
            .iter()
            .find(|r| r.product_accession.as_deref() == Some(accession))
            .or_else(|| reports.first());
        Ok(report.map(|r| r.cds.clone()).unwrap_or_default())
    }

    fn annotated_window(
        &self,
        genome_id: &str,
        start: u64,
        stop: u64,
    ) -> Result<Vec<String>, ProviderError> {
        let body = self.fetch(&self.window_url(genome_id, start, stop)?)?;
        match detect::detect_response(&body) {
            ResponseFormat::Fasta => Ok(fasta::headers(&body)),
            ResponseFormat::Empty => Ok(Vec::new()),
            other => Err(ProviderError::Malformed(format!(
                "expected CDS FASTA for {genome_id}:{start}-{stop}, got {other:?}"
            ))),
        }
    }

    fn sequence(&self, genome_id: &str, start: u64, stop: u64) -> Result<String, ProviderError> {
        let body = self.fetch(&self.sequence_url(genome_id, start, stop)?)?;
        fasta::sequence(&body).map_err(|e| malformed("nucleotide FASTA", e))
    }
}
