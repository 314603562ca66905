pub mod cron_helper;
