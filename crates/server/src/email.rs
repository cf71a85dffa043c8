use serde::Serialize;
use tera::{Context, Tera};

use sparky_core::config::BusinessConfig;
use sparky_core::domain::lead::Lead;
use sparky_core::domain::notification::{EmailContent, EmailKind};
use sparky_core::errors::ApplicationError;

const CONFIRMATION_BODY: &str = include_str!("../../../templates/email/confirmation.txt");
const QUOTE_BODY: &str = include_str!("../../../templates/email/quote.txt");
const REVIEW_REQUEST_BODY: &str = include_str!("../../../templates/email/review_request.txt");

/// Renders customer emails from the embedded tera templates.
pub struct EmailRenderer {
    templates: Tera,
    business: BusinessConfig,
}

#[derive(Serialize)]
struct LeadView<'a> {
    name: &'a str,
    phone: &'a str,
    suburb: &'a str,
    job_description: &'a str,
    status: &'a str,
}

/// Every email a lead could receive, rendered without sending.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct EmailPreview {
    pub confirmation: EmailContent,
    pub quote: EmailContent,
    pub review_request: EmailContent,
}

fn template_names(kind: EmailKind) -> (&'static str, &'static str) {
    match kind {
        EmailKind::Confirmation => ("confirmation.subject", "confirmation.txt"),
        EmailKind::Quote => ("quote.subject", "quote.txt"),
        EmailKind::ReviewRequest => ("review_request.subject", "review_request.txt"),
    }
}

impl EmailRenderer {
    pub fn new(business: BusinessConfig) -> Result<Self, tera::Error> {
        let mut templates = Tera::default();
        templates.add_raw_templates(vec![
            ("confirmation.subject", "Thanks for contacting {{ business.name }}!"),
            ("confirmation.txt", CONFIRMATION_BODY),
            ("quote.subject", "Your Free Quote Request - {{ business.name }}"),
            ("quote.txt", QUOTE_BODY),
            ("review_request.subject", "How did we do? - {{ business.name }}"),
            ("review_request.txt", REVIEW_REQUEST_BODY),
        ])?;

        Ok(Self { templates, business })
    }

    pub fn render(&self, kind: EmailKind, lead: &Lead) -> Result<EmailContent, ApplicationError> {
        let mut context = Context::new();
        context.insert("business", &self.business);
        context.insert(
            "lead",
            &LeadView {
                name: &lead.name,
                phone: &lead.phone,
                suburb: lead.suburb_or_default(),
                job_description: &lead.job_description,
                status: lead.status.as_str(),
            },
        );

        let (subject_template, body_template) = template_names(kind);
        let subject = self.render_template(subject_template, &context)?;
        let body = self.render_template(body_template, &context)?;

        Ok(EmailContent { subject: subject.trim().to_string(), body })
    }

    pub fn preview(&self, lead: &Lead) -> Result<EmailPreview, ApplicationError> {
        Ok(EmailPreview {
            confirmation: self.render(EmailKind::Confirmation, lead)?,
            quote: self.render(EmailKind::Quote, lead)?,
            review_request: self.render(EmailKind::ReviewRequest, lead)?,
        })
    }

    fn render_template(&self, name: &str, context: &Context) -> Result<String, ApplicationError> {
        self.templates.render(name, context).map_err(|error| {
            ApplicationError::Configuration(format!("email template `{name}` failed: {error}"))
        })
    }
}
