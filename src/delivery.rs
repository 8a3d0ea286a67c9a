use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Datelike, Local};
use log::{info, warn};

use crate::config::{DeliveryConfig, Recipient};
use crate::error::DeliveryError;
use crate::job::JobRecord;

/// Writes the run's records as `title,company,link`.
pub fn write_csv<P: AsRef<Path>>(records: &[JobRecord], path: P) -> Result<(), DeliveryError> {
    let mut csv_writer = csv::WriterBuilder::new().from_path(path.as_ref())?;
    for record in records {
        csv_writer.serialize(record)?;
    }
    csv_writer.flush()?;
    info!("Saved {} jobs to {:?}.", records.len(), path.as_ref());
    Ok(())
}

/// Link that reports the click to the tracker before redirecting. Without a tracker
/// the job link is used as-is.
pub fn tracking_link(tracker_url: Option<&str>, email: &str, record: &JobRecord) -> String {
    match tracker_url {
        Some(base) => format!(
            "{}?email={}&job={}&link={}",
            base,
            urlencoding::encode(email),
            urlencoding::encode(&record.title),
            urlencoding::encode(&record.link)
        ),
        None => record.link.clone(),
    }
}

pub fn subject() -> String {
    format!("Latest Jobs Updates – {}", Local::now().format("%d %b %Y"))
}

/// One HTML digest per recipient, each job card carrying the recipient's tracking link.
pub fn compose_digest(recipient: &Recipient, records: &[JobRecord], tracker_url: Option<&str>) -> String {
    let mut html = String::new();
    html.push_str("<html>\n<body style=\"font-family:Arial, sans-serif; padding:25px; line-height:1.6;\">\n");
    html.push_str(&format!("<h2>{}</h2>\n", escape(&subject())));
    html.push_str(&format!("<p>Dear <b>{}</b>,</p>\n", escape(&recipient.name)));
    html.push_str(&format!(
        "<p>Here are {} openings picked for you this time.</p>\n<div>\n",
        records.len()
    ));

    for record in records {
        let link = tracking_link(tracker_url, &recipient.email, record);
        html.push_str(&format!(
            "<div style=\"border:1px solid #ddd; border-radius:10px; padding:15px; margin-bottom:12px;\">\n\
             <h3 style=\"margin:0;\">{}</h3>\n<p style=\"margin:6px 0;\">{}</p>\n\
             <a href=\"{}\">View &amp; Apply</a>\n</div>\n",
            escape(&record.title),
            escape(&record.company),
            escape(&link)
        ));
    }

    html.push_str(&format!(
        "</div>\n<p style=\"font-size:12px; color:#777;\">Generated by Job Digest &copy; {}</p>\n</body>\n</html>\n",
        Local::now().year()
    ));
    html
}

/// Renders every recipient's digest into `outbox`, one file per address.
/// Returns the files written.
pub fn write_digests<P: AsRef<Path>>(
    config: &DeliveryConfig,
    records: &[JobRecord],
    outbox: P,
) -> Result<Vec<PathBuf>, DeliveryError> {
    if config.recipients.is_empty() {
        warn!("EMAIL_TO is empty. No digests written.");
        return Ok(Vec::new());
    }
    if config.tracker_url.is_none() {
        warn!("TRACKER_URL not set. Digests will link to the jobs directly.");
    }

    fs::create_dir_all(outbox.as_ref())?;
    let mut written = Vec::with_capacity(config.recipients.len());
    for recipient in &config.recipients {
        let html = compose_digest(recipient, records, config.tracker_url.as_deref());
        let path = outbox.as_ref().join(format!("{}.html", file_stem(&recipient.email)));
        fs::write(&path, html)?;
        info!("Digest for {} ({}) written to {:?}", recipient.name, recipient.email, path);
        written.push(path);
    }
    Ok(written)
}

fn file_stem(email: &str) -> String {
    email
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '@' || c == '.' || c == '-' { c } else { '_' })
        .collect()
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job() -> JobRecord {
        JobRecord {
            title: "Python Intern & Trainee".to_string(),
            company: "Acme".to_string(),
            link: "https://a.example/jobs/1?x=1".to_string(),
        }
    }

    #[test]
    fn tracking_link_encodes_every_component() {
        let link = tracking_link(Some("https://t.example/track"), "asha+1@x.org", &job());
        assert_eq!(
            link,
            "https://t.example/track?email=asha%2B1%40x.org&job=Python%20Intern%20%26%20Trainee\
             &link=https%3A%2F%2Fa.example%2Fjobs%2F1%3Fx%3D1"
        );
        assert_eq!(tracking_link(None, "asha@x.org", &job()), "https://a.example/jobs/1?x=1");
    }

    #[test]
    fn csv_has_title_company_link_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jobs.csv");
        write_csv(&[job()], &path).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let mut lines = content.lines();
        assert_eq!(lines.next(), Some("title,company,link"));
        assert_eq!(lines.next(), Some("Python Intern & Trainee,Acme,https://a.example/jobs/1?x=1"));
    }

    #[test]
    fn digests_are_written_per_recipient_and_escaped() {
        let dir = tempfile::tempdir().unwrap();
        let config = DeliveryConfig::from_values(
            None,
            "asha@x.org,binu@x.org",
            "Asha,Binu",
            Some("https://t.example/track".to_string()),
        );

        let files = write_digests(&config, &[job()], dir.path().join("outbox")).unwrap();
        assert_eq!(files.len(), 2);
        let html = fs::read_to_string(&files[0]).unwrap();
        assert!(html.contains("Dear <b>Asha</b>"));
        assert!(html.contains("Python Intern &amp; Trainee"));
        assert!(html.contains("email=asha%40x.org"));
    }

    #[test]
    fn no_recipients_means_no_files() {
        let dir = tempfile::tempdir().unwrap();
        let files = write_digests(&DeliveryConfig::default(), &[job()], dir.path()).unwrap();
        assert!(files.is_empty());
    }
}
