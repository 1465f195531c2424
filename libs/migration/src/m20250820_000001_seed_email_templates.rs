use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Seed the three club templates
        manager
            .get_connection()
            .execute_unprepared(
                r#"
            INSERT INTO email_templates (
                id, name, subject, html_content, variables, is_active,
                created_at, updated_at
            )
            VALUES
                (
                    '01990b3c-7c5f-7001-8000-000000000001',
                    'application_received',
                    'We received your application for {{position}}',
                    '<h1>Thanks, {{applicantName}}!</h1><p>Your application for the <strong>{{position}}</strong> position has been received. We will get back to you after the review round.</p>',
                    '["applicantName", "position"]'::jsonb,
                    true,
                    NOW(),
                    NOW()
                ),
                (
                    '01990b3c-7c5f-7002-8000-000000000002',
                    'status_update',
                    'Your application status: {{status}}',
                    '<h1>Hi {{applicantName}},</h1><p>Your application for <strong>{{position}}</strong> has moved to status: <strong>{{status}}</strong>.</p>',
                    '["applicantName", "position", "status"]'::jsonb,
                    true,
                    NOW(),
                    NOW()
                ),
                (
                    '01990b3c-7c5f-7003-8000-000000000003',
                    'event_announcement',
                    'Upcoming event: {{eventName}}',
                    '<h1>{{eventName}}</h1><p>Join us on <strong>{{eventDate}}</strong> at <strong>{{location}}</strong>. See you there!</p>',
                    '["eventName", "eventDate", "location"]'::jsonb,
                    true,
                    NOW(),
                    NOW()
                )
            ON CONFLICT (name) DO NOTHING
            "#,
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared(
                "DELETE FROM email_templates WHERE name IN ('application_received', 'status_update', 'event_announcement')",
            )
            .await?;

        Ok(())
    }
}
