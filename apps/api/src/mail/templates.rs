use serde::Serialize;
use tera::{Context, Tera};

use crate::mail::OutgoingEmail;

const REPORT_EMAIL: &str = r#"<!DOCTYPE html>
<html><body style="font-family: Arial, sans-serif; color: #1f2933; line-height: 1.6;">
  <p>Dear {{ name }},</p>
  <p>Thank you for completing the CCPM360 project management self-assessment.
     Your total score is <strong>{{ total_score | round(precision=1) }}</strong> out of 100,
     which places you at the <strong>{{ level }}</strong> level.</p>
  <p><a href="{{ link }}" style="display: inline-block; padding: 10px 18px; background: #1d4ed8;
        color: #ffffff; text-decoration: none; border-radius: 4px;">Download your full report (PDF)</a></p>
  <p style="font-size: 12px; color: #7b8794;">This link stays valid until {{ expires_at }}.</p>
  <p>The CCPM360 team</p>
  <img src="{{ pixel }}" width="1" height="1" alt="" style="display: block; border: 0;">
</body></html>"#;

const QUOTA_ALERT_EMAIL: &str = r#"<!DOCTYPE html>
<html><body style="font-family: Arial, sans-serif;">
  <p>Outbound email usage has reached <strong>{{ sent }}</strong> of the daily quota of
     <strong>{{ quota }}</strong> ({{ percent }}%).</p>
  <p>Further assessment report emails may be rejected by the provider once the quota is exhausted.</p>
</body></html>"#;

#[derive(Debug, Serialize)]
pub struct ReportEmail<'a> {
    pub to: &'a str,
    pub name: &'a str,
    pub total_score: f64,
    pub level: &'a str,
    /// Download link, already wrapped by the click tracker.
    pub link: &'a str,
    pub pixel: &'a str,
    pub expires_at: String,
}

pub const REPORT_SUBJECT: &str = "Your CCPM360 project management assessment report";

pub fn report_email(email: &ReportEmail<'_>) -> Result<OutgoingEmail, tera::Error> {
    Ok(OutgoingEmail {
        to: email.to.to_string(),
        subject: REPORT_SUBJECT.to_string(),
        html: render("report_email.html", REPORT_EMAIL, email)?,
    })
}

#[derive(Debug, Serialize)]
struct QuotaAlert {
    sent: u64,
    quota: u32,
    percent: u64,
}

pub fn quota_alert_email(to: &str, sent: u64, quota: u32) -> Result<OutgoingEmail, tera::Error> {
    let percent = if quota == 0 {
        100
    } else {
        sent * 100 / u64::from(quota)
    };
    Ok(OutgoingEmail {
        to: to.to_string(),
        subject: format!("[CCPM360] Email quota at {percent}%"),
        html: render(
            "quota_alert.html",
            QUOTA_ALERT_EMAIL,
            &QuotaAlert {
                sent,
                quota,
                percent,
            },
        )?,
    })
}

fn render<T: Serialize>(name: &str, template: &str, data: &T) -> Result<String, tera::Error> {
    let mut tera = Tera::default();
    tera.add_raw_template(name, template)?;
    tera.render(name, &Context::from_serialize(data)?)
}
