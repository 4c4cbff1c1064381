//! Built-in AWS security knowledge base and keyword matcher.
//!
//! Used whenever live generation is unavailable. Matching is deliberately
//! simple: no scoring, the first document in priority order wins.

use secureaws_types::api::QuickAction;
use secureaws_types::models::Source;

/// A canned answer on one topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KnowledgeDocument {
    pub id: String,
    pub title: String,
    /// Lower-case keywords. Multi-word entries match as consecutive words.
    pub keywords: Vec<String>,
    /// HTML answer body
    pub content: String,
    pub sources: Vec<Source>,
}

impl KnowledgeDocument {
    pub fn new(
        id: &str,
        title: &str,
        keywords: &[&str],
        content: &str,
        sources: Vec<Source>,
    ) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            keywords: keywords.iter().map(|k| k.to_lowercase()).collect(),
            content: content.to_string(),
            sources,
        }
    }

    fn matches(&self, query: &NormalizedQuery) -> bool {
        self.keywords.iter().any(|keyword| {
            let words: Vec<&str> = keyword.split(' ').collect();
            match words.as_slice() {
                [word] => query.tokens.iter().any(|token| token_matches(token, word)),
                phrase => query
                    .tokens
                    .windows(phrase.len())
                    .any(|window| window.iter().zip(phrase).all(|(t, w)| t.starts_with(w))),
            }
        })
    }
}

/// Keywords shorter than this are acronyms ("s3", "iam", "vpc") and must be
/// the whole token, optionally pluralised.
const MIN_INFIX_KEYWORD: usize = 4;

/// Longer keywords match anywhere inside a token, so "networking" hits
/// "network" and "policies" hits "policy".
fn token_matches(token: &str, keyword: &str) -> bool {
    if keyword.len() < MIN_INFIX_KEYWORD {
        return token == keyword || token.strip_suffix('s') == Some(keyword);
    }
    if token.contains(keyword) {
        return true;
    }
    match keyword.strip_suffix('y') {
        Some(stem) => token.contains(&format!("{stem}ies")),
        None => false,
    }
}

struct NormalizedQuery {
    tokens: Vec<String>,
}

impl NormalizedQuery {
    fn new(query: &str) -> Self {
        let tokens = query
            .split_whitespace()
            .map(|t| t.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();
        Self { tokens }
    }
}

/// Stateless keyword lookup over a fixed, ordered document set.
#[derive(Debug, Clone)]
pub struct KnowledgeMatcher {
    documents: Vec<KnowledgeDocument>,
}

impl Default for KnowledgeMatcher {
    fn default() -> Self {
        Self::new(builtin_documents())
    }
}

impl KnowledgeMatcher {
    /// Documents are tried in the given order.
    pub fn new(documents: Vec<KnowledgeDocument>) -> Self {
        Self { documents }
    }

    /// First document whose keyword set intersects the query, if any.
    pub fn match_query(&self, query: &str) -> Option<&KnowledgeDocument> {
        let query = NormalizedQuery::new(query);
        if query.tokens.is_empty() {
            return None;
        }
        self.documents.iter().find(|doc| doc.matches(&query))
    }
}

/// Suggestions offered next to the chat input.
pub fn quick_actions() -> Vec<QuickAction> {
    [
        (
            "S3 Security Best Practices",
            "What are the security best practices for S3 bucket configuration?",
        ),
        (
            "IAM Policy Examples",
            "Show me IAM policy examples for least privilege access",
        ),
        (
            "VPC Security Configuration",
            "How do I configure VPC security groups and NACLs?",
        ),
    ]
    .into_iter()
    .map(|(label, query)| QuickAction {
        label: label.to_string(),
        query: query.to_string(),
    })
    .collect()
}

/// The S3, IAM and VPC documents, in priority order.
pub fn builtin_documents() -> Vec<KnowledgeDocument> {
    vec![
        KnowledgeDocument::new(
            "s3-security",
            "S3 Security Best Practices",
            &["s3", "bucket", "storage", "encryption"],
            S3_CONTENT,
            vec![Source::aws_waf(), Source::confluence()],
        ),
        KnowledgeDocument::new(
            "iam-practices",
            "IAM Security Best Practices",
            &["iam", "identity", "policy", "role", "permission", "mfa"],
            IAM_CONTENT,
            vec![Source::aws_waf(), Source::confluence()],
        ),
        KnowledgeDocument::new(
            "vpc-security",
            "VPC Network Security",
            &["vpc", "network", "subnet", "security group", "nacl", "flow logs"],
            VPC_CONTENT,
            vec![Source::aws_waf(), Source::general()],
        ),
    ]
}

const S3_CONTENT: &str = r#"<p>Here are the essential S3 security best practices:</p>
<ul class="list-disc ml-4 space-y-1 text-sm mt-2">
  <li><strong>Block Public Access:</strong> Enable "Block all public access" unless specifically required for your use case</li>
  <li><strong>Enable Encryption:</strong> Use SSE-S3, SSE-KMS, or SSE-C for data at rest</li>
  <li><strong>Bucket Policies:</strong> Implement least privilege access with proper IAM policies</li>
  <li><strong>Access Logging:</strong> Enable CloudTrail and S3 access logs for monitoring</li>
  <li><strong>MFA Delete:</strong> Require multi-factor authentication for object deletion</li>
</ul>
<div class="code-block font-code text-sm mt-3">
  <pre class="text-green-400">{
  "Version": "2012-10-17",
  "Statement": [
    {
      "Sid": "DenyInsecureConnections",
      "Effect": "Deny",
      "Principal": "*",
      "Action": "s3:*",
      "Resource": ["arn:aws:s3:::your-bucket/*"],
      "Condition": { "Bool": { "aws:SecureTransport": "false" } }
    }
  ]
}</pre>
</div>
<div class="bg-blue-50 p-3 rounded-lg border-l-4 border-blue-400 mt-3">
  <p class="text-sm"><strong>Internal Policy:</strong> All S3 buckets must have encryption enabled and public access blocked unless approved by security team.</p>
</div>"#;

const IAM_CONTENT: &str = r#"<p>IAM security follows these core principles:</p>
<ul class="list-disc ml-4 space-y-1 text-sm mt-2">
  <li><strong>Least Privilege:</strong> Grant only the minimum permissions needed</li>
  <li><strong>Use Roles:</strong> Prefer IAM roles over IAM users for applications</li>
  <li><strong>Enable MFA:</strong> Require multi-factor authentication for all human users</li>
  <li><strong>Rotate Keys:</strong> Regularly rotate access keys and passwords</li>
  <li><strong>Temporary Credentials:</strong> Use STS for temporary access when possible</li>
</ul>
<div class="code-block font-code text-sm mt-3">
  <pre class="text-green-400">{
  "Version": "2012-10-17",
  "Statement": [
    {
      "Effect": "Allow",
      "Action": ["s3:GetObject", "s3:PutObject"],
      "Resource": "arn:aws:s3:::example-bucket/*",
      "Condition": {
        "StringEquals": { "s3:x-amz-server-side-encryption": "AES256" }
      }
    }
  ]
}</pre>
</div>
<div class="bg-blue-50 p-3 rounded-lg border-l-4 border-blue-400 mt-3">
  <p class="text-sm"><strong>Internal Policy:</strong> All production IAM policies must be reviewed and approved by the security team before deployment.</p>
</div>"#;

const VPC_CONTENT: &str = r#"<p>VPC network security configuration guidelines:</p>
<ul class="list-disc ml-4 space-y-1 text-sm mt-2">
  <li><strong>Private Subnets:</strong> Place application resources in private subnets</li>
  <li><strong>Security Groups:</strong> Configure stateful firewall rules at instance level</li>
  <li><strong>Network ACLs:</strong> Add subnet-level stateless firewall rules</li>
  <li><strong>VPC Flow Logs:</strong> Enable logging for network traffic monitoring</li>
  <li><strong>NAT Gateway:</strong> Use NAT Gateways for secure outbound internet access</li>
</ul>
<div class="bg-yellow-50 p-3 rounded-lg border-l-4 border-yellow-400 mt-3">
  <p class="text-sm"><strong>Note:</strong> Ensure all production VPCs follow our internal networking standards documented in Confluence.</p>
</div>
<div class="code-block font-code text-sm mt-3">
  <pre class="text-green-400"># Security Group allowing HTTPS only
aws ec2 authorize-security-group-ingress \
  --group-id sg-12345678 \
  --protocol tcp \
  --port 443 \
  --cidr 0.0.0.0/0</pre>
</div>"#;
