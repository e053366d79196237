//! SNS schemas: topics and subscriptions

use super::{AwsSchemaConfig, tags_type};
use crate::resources::*;
use tenant_mgmt_core::schema::{AttributeSchema, AttributeType, ResourceSchema};

pub fn topic_config() -> AwsSchemaConfig {
    AwsSchemaConfig {
        aws_type_name: SNS_TOPIC,
        has_tags: true,
        schema: ResourceSchema::new(SNS_TOPIC)
            .attribute(AttributeSchema::new("TopicName", AttributeType::String))
            .attribute(AttributeSchema::new("DisplayName", AttributeType::String))
            .attribute(AttributeSchema::new("Tags", tags_type())),
    }
}

pub fn subscription_config() -> AwsSchemaConfig {
    AwsSchemaConfig {
        aws_type_name: SNS_SUBSCRIPTION,
        has_tags: false,
        schema: ResourceSchema::new(SNS_SUBSCRIPTION)
            .attribute(AttributeSchema::new("TopicArn", AttributeType::String).required())
            .attribute(
                AttributeSchema::new(
                    "Protocol",
                    AttributeType::enumeration(&["email", "email-json", "https", "sqs", "lambda"]),
                )
                .required(),
            )
            .attribute(AttributeSchema::new("Endpoint", AttributeType::String).required()),
    }
}

pub fn configs() -> Vec<AwsSchemaConfig> {
    vec![topic_config(), subscription_config()]
}
