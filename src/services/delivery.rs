use serde_json::json;

/// Outbound delivery for verification codes. Email and SMS go out through
/// the configured providers when their credentials are present; otherwise
/// the code lands in the log, which keeps local development working.
pub struct CodeDelivery {
    sendgrid_api_key: Option<String>,
    twilio_account_sid: Option<String>,
    twilio_auth_token: Option<String>,
    twilio_phone_number: Option<String>,
    client: reqwest::Client,
}

impl CodeDelivery {
    pub fn from_env() -> Self {
        let delivery = Self {
            sendgrid_api_key: non_empty(std::env::var("SENDGRID_API_KEY").ok()),
            twilio_account_sid: non_empty(std::env::var("TWILIO_ACCOUNT_SID").ok()),
            twilio_auth_token: non_empty(std::env::var("TWILIO_AUTH_TOKEN").ok()),
            twilio_phone_number: non_empty(std::env::var("TWILIO_PHONE_NUMBER").ok()),
            client: reqwest::Client::new(),
        };
        if delivery.sendgrid_api_key.is_none() {
            tracing::warn!("SENDGRID_API_KEY not set; verification emails will be logged instead of sent");
        }
        if delivery.twilio_account_sid.is_none() || delivery.twilio_auth_token.is_none() {
            tracing::warn!("Twilio credentials not set; verification SMS will be logged instead of sent");
        }
        delivery
    }

    pub async fn send_email(&self, email: &str, code: &str) {
        let Some(api_key) = &self.sendgrid_api_key else {
            tracing::info!(to = %email, code = %code, "[dev] email verification code");
            return;
        };

        let body = json!({
            "personalizations": [{"to": [{"email": email}]}],
            "from": {"email": "noreply@atlas.app"},
            "subject": "Your verification code",
            "content": [{
                "type": "text/plain",
                "value": format!("Your verification code is {}. It expires in 10 minutes.", code),
            }],
        });

        let result = self
            .client
            .post("https://api.sendgrid.com/v3/mail/send")
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await;

        match result {
            Ok(resp) if resp.status().is_success() => {
                tracing::info!(to = %email, "verification email sent");
            }
            Ok(resp) => tracing::error!(to = %email, status = %resp.status(), "email delivery rejected"),
            Err(e) => tracing::error!(to = %email, error = %e, "email delivery failed"),
        }
    }

    pub async fn send_sms(&self, phone: &str, code: &str) {
        let (Some(sid), Some(token), Some(from)) = (
            &self.twilio_account_sid,
            &self.twilio_auth_token,
            &self.twilio_phone_number,
        ) else {
            tracing::info!(to = %phone, code = %code, "[dev] SMS verification code");
            return;
        };

        let to = normalize_phone(phone);
        let url = format!("https://api.twilio.com/2010-04-01/Accounts/{}/Messages.json", sid);
        let body_text = format!("Your verification code is {}. It expires in 10 minutes.", code);
        let params = [("To", to.as_str()), ("From", from.as_str()), ("Body", body_text.as_str())];

        let result = self
            .client
            .post(&url)
            .basic_auth(sid, Some(token))
            .form(&params)
            .send()
            .await;

        match result {
            Ok(resp) if resp.status().is_success() => {
                tracing::info!(to = %to, "verification SMS sent");
            }
            Ok(resp) => tracing::error!(to = %to, status = %resp.status(), "SMS delivery rejected"),
            Err(e) => tracing::error!(to = %to, error = %e, "SMS delivery failed"),
        }
    }
}

fn non_empty(v: Option<String>) -> Option<String> {
    v.filter(|s| !s.trim().is_empty())
}

/// Digits-only numbers get the default country prefix
fn normalize_phone(phone: &str) -> String {
    if phone.starts_with('+') {
        phone.to_string()
    } else {
        let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();
        format!("+55{}", digits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phone_normalization() {
        assert_eq!(normalize_phone("+14155552671"), "+14155552671");
        assert_eq!(normalize_phone("(11) 98765-4321"), "+5511987654321");
    }
}
